//! Scan history queries and the statements behind the scan transaction.

use sqlx::SqliteConnection;

use super::db::{DatabaseError, QrDatabase};
use super::models::{QrCode, ScanEvent};

/// Parameters for appending a scan event.
pub struct NewScanEvent<'a> {
    pub user_agent: &'a str,
    pub source_ip: &'a str,
    pub referer: &'a str,
    pub country: &'a str,
    pub city: &'a str,
    pub tracking_token: &'a str,
}

impl QrDatabase {
    /// Scan history for one record, oldest first.
    pub async fn list_scan_events(&self, code_id: &str) -> Result<Vec<ScanEvent>, DatabaseError> {
        let events = sqlx::query_as::<_, ScanEvent>(
            "SELECT * FROM scan_events WHERE code_id = ? ORDER BY timestamp ASC, id ASC",
        )
        .bind(code_id)
        .fetch_all(self.pool())
        .await?;

        Ok(events)
    }

    /// Scan history across every record an owner has.
    pub async fn list_owner_scan_events(
        &self,
        owner_id: &str,
    ) -> Result<Vec<ScanEvent>, DatabaseError> {
        let events = sqlx::query_as::<_, ScanEvent>(
            "SELECT e.* FROM scan_events e JOIN qr_codes c ON c.id = e.code_id WHERE c.owner_id = ? ORDER BY e.timestamp ASC, e.id ASC",
        )
        .bind(owner_id)
        .fetch_all(self.pool())
        .await?;

        Ok(events)
    }

    /// Number of stored scan events for a record.
    pub async fn count_scan_events(&self, code_id: &str) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scan_events WHERE code_id = ?")
            .bind(code_id)
            .fetch_one(self.pool())
            .await?;

        Ok(row.0)
    }
}

// =========================================================================
// Transaction statements (used by the scan recorder)
// =========================================================================

/// Take the database write lock before the first read.
///
/// A deferred transaction that reads first and writes later fails its
/// upgrade immediately when another writer commits in between; writing
/// first makes concurrent scans wait on the busy timeout instead.
pub(crate) async fn claim_write_lock(
    conn: &mut SqliteConnection,
    code_id: &str,
) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE qr_codes SET scan_count = scan_count WHERE id = ?")
        .bind(code_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(crate) async fn fetch_code(
    conn: &mut SqliteConnection,
    code_id: &str,
) -> Result<Option<QrCode>, DatabaseError> {
    let code = sqlx::query_as::<_, QrCode>("SELECT * FROM qr_codes WHERE id = ?")
        .bind(code_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(code)
}

/// Conditionally count one scan and append its event.
///
/// The `UPDATE` only matches while the record is not expired and below its
/// ceiling. Returns `false` when it matched nothing; no event is written then.
pub(crate) async fn apply_scan(
    conn: &mut SqliteConnection,
    code_id: &str,
    event: &NewScanEvent<'_>,
    now: i64,
) -> Result<bool, DatabaseError> {
    let updated = sqlx::query(
        "UPDATE qr_codes SET scan_count = scan_count + 1, last_scanned_at = ? \
         WHERE id = ? AND expired = 0 AND (max_scans = 0 OR scan_count < max_scans)",
    )
    .bind(now)
    .bind(code_id)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query(
        "INSERT INTO scan_events (code_id, user_agent, source_ip, referer, country, city, tracking_token, timestamp) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(code_id)
    .bind(event.user_agent)
    .bind(event.source_ip)
    .bind(event.referer)
    .bind(event.country)
    .bind(event.city)
    .bind(event.tracking_token)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(true)
}
