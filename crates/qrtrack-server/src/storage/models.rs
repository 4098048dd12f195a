//! Data models for qrtrack storage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A persisted QR code record. All timestamps are unix seconds (UTC).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QrCode {
    pub id: String,
    pub owner_id: String,
    pub destination: String,
    pub qr_type: String,
    pub tracking_url: Option<String>,
    pub is_password_protected: bool,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub expires_at: Option<i64>,
    pub max_scans: i64,
    pub scan_count: i64,
    pub last_scanned_at: Option<i64>,
    pub expired: bool,
    pub created_at: i64,
}

impl QrCode {
    /// Scans left before the ceiling, `None` when unlimited.
    pub fn remaining_scans(&self) -> Option<i64> {
        (self.max_scans > 0).then(|| (self.max_scans - self.scan_count).max(0))
    }
}

/// One recorded scan. Rows are append-only; `id` follows commit order.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScanEvent {
    pub id: i64,
    pub code_id: String,
    pub user_agent: String,
    pub source_ip: String,
    pub referer: String,
    pub country: String,
    pub city: String,
    pub tracking_token: String,
    pub timestamp: i64,
}

/// Kind of payload encoded in the QR image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrType {
    #[default]
    Url,
    Text,
    Vcard,
    Wifi,
    Email,
    Sms,
    Geo,
    Event,
    Phone,
}

impl QrType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Text => "text",
            Self::Vcard => "vcard",
            Self::Wifi => "wifi",
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Geo => "geo",
            Self::Event => "event",
            Self::Phone => "phone",
        }
    }
}

impl fmt::Display for QrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QrType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "url" => Ok(Self::Url),
            "text" => Ok(Self::Text),
            "vcard" => Ok(Self::Vcard),
            "wifi" => Ok(Self::Wifi),
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            "geo" => Ok(Self::Geo),
            "event" => Ok(Self::Event),
            "phone" => Ok(Self::Phone),
            other => Err(format!("unknown QR type: {other}")),
        }
    }
}
