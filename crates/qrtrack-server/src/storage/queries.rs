//! QR code record queries.

use qrtrack_core::db::unix_timestamp;

use super::db::{DatabaseError, QrDatabase};
use super::models::{QrCode, QrType};

/// Parameters for inserting a new, already-normalised record.
pub struct NewCode<'a> {
    pub id: &'a str,
    pub owner_id: &'a str,
    pub destination: &'a str,
    pub qr_type: QrType,
    pub tracking_url: Option<&'a str>,
    pub is_password_protected: bool,
    pub password_hash: &'a str,
    pub expires_at: Option<i64>,
    pub max_scans: i64,
}

impl QrDatabase {
    /// Insert a record with `scan_count = 0` and `expired = 0`.
    pub async fn create_code(&self, params: &NewCode<'_>) -> Result<QrCode, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO qr_codes (id, owner_id, destination, qr_type, tracking_url, is_password_protected, password_hash, expires_at, max_scans, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(params.id)
        .bind(params.owner_id)
        .bind(params.destination)
        .bind(params.qr_type.as_str())
        .bind(params.tracking_url)
        .bind(params.is_password_protected)
        .bind(if params.is_password_protected {
            params.password_hash
        } else {
            ""
        })
        .bind(params.expires_at)
        .bind(params.max_scans.max(0))
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_code(params.id).await
    }

    /// Get a record by ID.
    pub async fn get_code(&self, id: &str) -> Result<QrCode, DatabaseError> {
        sqlx::query_as::<_, QrCode>("SELECT * FROM qr_codes WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("QR code {id}")))
    }

    /// Get a record by ID, scoped to its owner.
    pub async fn get_owned_code(&self, id: &str, owner_id: &str) -> Result<QrCode, DatabaseError> {
        sqlx::query_as::<_, QrCode>("SELECT * FROM qr_codes WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("QR code {id}")))
    }

    /// List an owner's records in creation order.
    pub async fn list_codes_by_owner(&self, owner_id: &str) -> Result<Vec<QrCode>, DatabaseError> {
        let codes = sqlx::query_as::<_, QrCode>(
            "SELECT * FROM qr_codes WHERE owner_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(owner_id)
        .fetch_all(self.pool())
        .await?;

        Ok(codes)
    }

    /// Set the sticky `expired` flag.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub(crate) async fn mark_expired(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE qr_codes SET expired = 1 WHERE id = ? AND expired = 0")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
