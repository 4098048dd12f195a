//! Transactional scan recording.
//!
//! Each call runs one `SQLite` transaction: read the record, reject if it is
//! expired, then count the scan with a conditional update that only matches
//! while the record is unexpired and below its ceiling. The scan event is
//! appended in the same transaction, so `scan_count` always equals the
//! number of stored events.
//!
//! There is no retry. A lost race surfaces as [`ScanRejection::Conflict`]
//! and the caller decides what to do with it.

use std::sync::Arc;

use qrtrack_core::db::unix_timestamp;

use super::expiry::{ExpiryReason, expiry_reason, limit_reached};
use super::observer::{ScanObserver, TracingObserver};
use crate::storage::queries_scans::{apply_scan, claim_write_lock, fetch_code};
use crate::storage::{DatabaseError, NewScanEvent, QrCode, QrDatabase};

pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Request metadata attached to a scan. Stored as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanInput {
    pub user_agent: String,
    pub source_ip: String,
    pub referer: String,
    pub country: String,
    pub city: String,
    pub tracking_token: String,
}

impl Default for ScanInput {
    fn default() -> Self {
        Self {
            user_agent: String::new(),
            source_ip: String::new(),
            referer: String::new(),
            country: UNKNOWN_LOCATION.to_string(),
            city: UNKNOWN_LOCATION.to_string(),
            tracking_token: String::new(),
        }
    }
}

impl ScanInput {
    fn as_event(&self) -> NewScanEvent<'_> {
        NewScanEvent {
            user_agent: &self.user_agent,
            source_ip: &self.source_ip,
            referer: &self.referer,
            country: &self.country,
            city: &self.city,
            tracking_token: &self.tracking_token,
        }
    }
}

/// Why a scan was not recorded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanRejection {
    #[error("QR code not found")]
    NotFound,

    #[error("QR code has expired")]
    Expired,

    #[error("QR code has reached its maximum number of scans")]
    LimitReached,

    /// Lost a race with a concurrent scan. Nothing was written.
    #[error("scan could not be recorded")]
    Conflict,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<DatabaseError> for ScanRejection {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::Busy(_) => Self::Conflict,
            DatabaseError::NotFound(_) => Self::NotFound,
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for ScanRejection {
    fn from(e: sqlx::Error) -> Self {
        DatabaseError::from(e).into()
    }
}

/// Records scans against stored QR codes.
#[derive(Clone)]
pub struct ScanRecorder {
    db: QrDatabase,
    observer: Arc<dyn ScanObserver>,
}

impl ScanRecorder {
    pub fn new(db: QrDatabase) -> Self {
        Self::with_observer(db, Arc::new(TracingObserver))
    }

    pub fn with_observer(db: QrDatabase, observer: Arc<dyn ScanObserver>) -> Self {
        Self { db, observer }
    }

    /// Record one scan of `code_id`.
    ///
    /// On success returns the record as committed, with `expired` set when
    /// this scan reached the ceiling.
    pub async fn record_scan(
        &self,
        code_id: &str,
        scan: &ScanInput,
    ) -> Result<QrCode, ScanRejection> {
        let result = self.try_record(code_id, scan).await;
        match &result {
            Ok(code) => self.observer.on_recorded(code),
            Err(rejection) => self.observer.on_rejected(code_id, rejection),
        }
        result
    }

    /// Reject an already-loaded record that is expired as of now, without
    /// recording anything. Persists the flag the same way a scan would.
    pub async fn ensure_valid(&self, code: &QrCode) -> Result<(), ScanRejection> {
        let Some(reason) = expiry_reason(code, unix_timestamp()) else {
            return Ok(());
        };
        if !code.expired {
            self.persist_expired(&code.id, reason).await;
        }
        let rejection = rejection_for(code);
        self.observer.on_rejected(&code.id, &rejection);
        Err(rejection)
    }

    async fn try_record(&self, code_id: &str, scan: &ScanInput) -> Result<QrCode, ScanRejection> {
        let now = unix_timestamp();
        // Dropping `tx` on any early return rolls it back.
        let mut tx = self.db.pool().begin().await?;

        claim_write_lock(&mut tx, code_id).await?;
        let code = fetch_code(&mut tx, code_id)
            .await?
            .ok_or(ScanRejection::NotFound)?;

        if let Some(reason) = expiry_reason(&code, now) {
            tx.rollback().await?;
            if !code.expired {
                self.persist_expired(code_id, reason).await;
            }
            return Err(rejection_for(&code));
        }

        if !apply_scan(&mut tx, code_id, &scan.as_event(), now).await? {
            return Err(ScanRejection::Conflict);
        }

        let mut updated = fetch_code(&mut tx, code_id)
            .await?
            .ok_or(ScanRejection::NotFound)?;
        tx.commit().await?;

        if limit_reached(&updated) && self.persist_expired(code_id, ExpiryReason::ScanLimit).await
        {
            updated.expired = true;
        }

        Ok(updated)
    }

    /// Best-effort write of the sticky flag outside the scan transaction.
    ///
    /// Returns whether the flag is now known to be set. A failure only
    /// delays the flag: every later scan re-evaluates the ceiling.
    async fn persist_expired(&self, code_id: &str, reason: ExpiryReason) -> bool {
        match self.db.mark_expired(code_id).await {
            Ok(changed) => {
                if changed {
                    self.observer.on_expired(code_id, reason);
                }
                true
            }
            Err(e) => {
                self.observer.on_expire_failed(code_id, &e);
                false
            }
        }
    }
}

/// Ceiling takes precedence over other reasons when reporting.
const fn rejection_for(code: &QrCode) -> ScanRejection {
    if limit_reached(code) {
        ScanRejection::LimitReached
    } else {
        ScanRejection::Expired
    }
}
