//! Database connection and initialization.

pub use qrtrack_core::db::DatabaseError;

qrtrack_core::define_database!(QrDatabase, "QR database migrations complete");

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory_works() {
        let db = QrDatabase::open_in_memory().await;
        assert!(db.is_ok());
    }
}
