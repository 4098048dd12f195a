//! Configuration resolution for qrtrack.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`~/.config/qrtrack/settings.json`)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::db::PoolSettings;
use crate::error::{Error, Result};

/// Complete qrtrack configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Public origin used when issuing tracking URLs (e.g. `https://qr.example.com`).
    /// When unset, the request's `Host` header is used.
    pub public_base_url: Option<String>,
    pub cors_max_age_secs: u64,
    /// Take the scan's client address from the first `X-Forwarded-For` hop.
    /// Only enable behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            public_base_url: None,
            cors_max_age_secs: 60 * 60,
            trust_forwarded_for: false,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            max_connections: 5,
            busy_timeout_secs: 5,
        }
    }
}

impl StorageConfig {
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_connections.max(1),
            busy_timeout: Duration::from_secs(self.busy_timeout_secs),
        }
    }
}

/// Tracking URL configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Whether new codes get a tracking URL when the request does not say.
    pub enabled_by_default: bool,
    pub token_length: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled_by_default: true,
            token_length: 10,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file {} does not exist",
                path.display()
            )));
        }
        let overlay = load_config_file(path)?;
        merge_config(&mut config, overlay);
    }

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("qrtrack").join("settings.json"))
}

/// Default database location when none is configured.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("qrtrack").join("qrtrack.db"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    if overlay.server.public_base_url.is_some() {
        base.server.public_base_url = overlay.server.public_base_url;
    }
    base.server.cors_max_age_secs = overlay.server.cors_max_age_secs;
    base.server.trust_forwarded_for = overlay.server.trust_forwarded_for;

    if overlay.storage.database_path.is_some() {
        base.storage.database_path = overlay.storage.database_path;
    }
    base.storage.max_connections = overlay.storage.max_connections;
    base.storage.busy_timeout_secs = overlay.storage.busy_timeout_secs;

    base.tracking = overlay.tracking;
}

fn apply_env_overrides(config: &mut Config) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("QRTRACK_BASE_URL") {
        config.server.public_base_url = Some(val);
    }
    if let Some(flag) = lookup("QRTRACK_TRUST_FORWARDED_FOR") {
        config.server.trust_forwarded_for = matches!(flag.as_str(), "1" | "true" | "yes");
    }
    if let Some(n) = lookup("QRTRACK_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
        config.storage.max_connections = n;
    }
    if let Some(n) = lookup("QRTRACK_BUSY_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        config.storage.busy_timeout_secs = n;
    }
}
