//! `qrtrack` Core Library
//!
//! Shared functionality for `qrtrack` components:
//! - `SQLite` pool helpers and the `define_database!` macro
//! - Layered configuration resolution
//! - Tracing subscriber initialisation
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
