//! Expiration evaluation for QR code records.
//!
//! Pure functions over a snapshot of a record. A record is expired when its
//! sticky flag is set, its expiry date has passed, or its scan ceiling has
//! been reached. Absent settings never restrict.

use crate::storage::QrCode;

/// Why a record counts as expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    /// The stored `expired` flag is already set.
    Flagged,
    /// `expires_at` lies strictly in the past.
    DatePassed,
    /// `scan_count` has reached a non-zero `max_scans`.
    ScanLimit,
}

impl ExpiryReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flagged => "flagged",
            Self::DatePassed => "date_passed",
            Self::ScanLimit => "scan_limit",
        }
    }
}

/// First matching reason, cheapest check first.
pub fn expiry_reason(code: &QrCode, now: i64) -> Option<ExpiryReason> {
    if code.expired {
        return Some(ExpiryReason::Flagged);
    }
    if code.expires_at.is_some_and(|at| now > at) {
        return Some(ExpiryReason::DatePassed);
    }
    if limit_reached(code) {
        return Some(ExpiryReason::ScanLimit);
    }
    None
}

pub fn is_expired(code: &QrCode, now: i64) -> bool {
    expiry_reason(code, now).is_some()
}

/// `true` when a ceiling is configured and the count has met it.
pub const fn limit_reached(code: &QrCode) -> bool {
    code.max_scans > 0 && code.scan_count >= code.max_scans
}
