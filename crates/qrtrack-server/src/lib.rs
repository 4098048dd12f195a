//! qrtrack server
//!
//! Records scans of stored QR codes and enforces their expiry rules:
//! an absolute expiry date, a scan ceiling, and a sticky `expired` flag.
//! Every accepted scan increments the record's counter and appends to its
//! history in one `SQLite` transaction, so concurrent scans can never push
//! a record past its ceiling.
//!
//! - [`scan`]: expiry evaluation and the transactional recorder
//! - [`storage`]: `SQLite` persistence
//! - [`tracking`]: tracking URL issuance
//! - [`analytics`]: read-side rollups
//! - [`security`]: creation-time security settings and password hashing
//! - [`geo`]: IP geolocation
//! - [`server`]: axum routes

pub mod analytics;
pub mod geo;
pub mod scan;
pub mod security;
pub mod server;
pub mod storage;
pub mod tracking;
