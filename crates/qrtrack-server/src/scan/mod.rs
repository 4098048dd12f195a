//! Scan recording and expiration enforcement.

pub mod expiry;
pub mod observer;
pub mod recorder;

pub use expiry::{ExpiryReason, expiry_reason, is_expired, limit_reached};
pub use observer::{ScanObserver, TracingObserver};
pub use recorder::{ScanInput, ScanRecorder, ScanRejection};
