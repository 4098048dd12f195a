//! `SQLite` storage for qrtrack.
//!
//! Provides persistence for QR code records and their append-only scan
//! history.

mod db;
mod models;
mod queries;
pub(crate) mod queries_scans;


pub use db::{DatabaseError, QrDatabase};
pub use models::*;
pub use queries::NewCode;
pub use queries_scans::NewScanEvent;
