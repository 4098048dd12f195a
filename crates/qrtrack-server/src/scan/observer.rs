//! Observability hook for the scan recorder.

use tracing::{debug, info, warn};

use super::expiry::ExpiryReason;
use super::recorder::ScanRejection;
use crate::storage::{DatabaseError, QrCode};

/// Receives scan lifecycle notifications. Implementations must not block
/// and cannot influence the outcome of a scan.
pub trait ScanObserver: Send + Sync {
    fn on_recorded(&self, _code: &QrCode) {}

    fn on_rejected(&self, _code_id: &str, _rejection: &ScanRejection) {}

    /// The sticky flag was set by this process.
    fn on_expired(&self, _code_id: &str, _reason: ExpiryReason) {}

    /// A best-effort expiry write failed; the next scan re-checks the ceiling.
    fn on_expire_failed(&self, _code_id: &str, _error: &DatabaseError) {}
}

/// Default observer: structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ScanObserver for TracingObserver {
    fn on_recorded(&self, code: &QrCode) {
        info!(
            code_id = %code.id,
            scan_count = code.scan_count,
            max_scans = code.max_scans,
            remaining = ?code.remaining_scans(),
            expired = code.expired,
            "Scan recorded"
        );
    }

    fn on_rejected(&self, code_id: &str, rejection: &ScanRejection) {
        match rejection {
            ScanRejection::StoreUnavailable(e) => {
                warn!(code_id = %code_id, error = %e, "Scan failed: store unavailable");
            }
            other => {
                debug!(code_id = %code_id, reason = %other, "Scan rejected");
            }
        }
    }

    fn on_expired(&self, code_id: &str, reason: ExpiryReason) {
        info!(code_id = %code_id, reason = reason.as_str(), "QR code marked expired");
    }

    fn on_expire_failed(&self, code_id: &str, error: &DatabaseError) {
        warn!(code_id = %code_id, error = %error, "Failed to persist expired flag");
    }
}
