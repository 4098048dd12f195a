//! IP geolocation.
//!
//! Lookups are synchronous and never fail loudly: an address with no data
//! resolves to `None`, which callers record as `"Unknown"`.

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Location {
    pub country: String,
    pub city: String,
}

pub trait GeoLocator: Send + Sync {
    fn lookup(&self, ip: IpAddr) -> Option<Location>;
}

/// Resolves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownLocator;

impl GeoLocator for UnknownLocator {
    fn lookup(&self, _ip: IpAddr) -> Option<Location> {
        None
    }
}

/// Exact-address lookup table.
///
/// Loaded from a JSON object mapping address strings to
/// `{"country": .., "city": ..}`. Keys that do not parse as addresses are
/// skipped with a warning.
#[derive(Debug, Clone, Default)]
pub struct GeoTable {
    entries: HashMap<IpAddr, Location>,
}

impl GeoTable {
    pub fn from_entries(entries: impl IntoIterator<Item = (IpAddr, Location)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(ip, loc)| (ip.to_canonical(), loc))
                .collect(),
        }
    }

    pub fn from_json(json: &str) -> qrtrack_core::Result<Self> {
        let raw: HashMap<String, Location> = serde_json::from_str(json)?;
        let mut entries = HashMap::with_capacity(raw.len());
        for (key, location) in raw {
            match key.trim().parse::<IpAddr>() {
                Ok(ip) => {
                    entries.insert(ip.to_canonical(), location);
                }
                Err(_) => tracing::warn!(key = %key, "Skipping invalid address in geo table"),
            }
        }
        Ok(Self { entries })
    }

    pub fn from_json_file(path: &Path) -> qrtrack_core::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl GeoLocator for GeoTable {
    fn lookup(&self, ip: IpAddr) -> Option<Location> {
        self.entries.get(&ip.to_canonical()).cloned()
    }
}

/// Parse a client address string, accepting the `::ffff:` IPv4-mapped form.
pub fn parse_client_ip(raw: &str) -> Option<IpAddr> {
    raw.trim()
        .parse::<IpAddr>()
        .ok()
        .map(|ip| ip.to_canonical())
}
