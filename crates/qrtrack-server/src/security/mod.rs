//! Security settings supplied at creation time.
//!
//! Request bodies are loosely typed. Everything is coerced here into the
//! shape the store accepts: a real boolean, a hashed password, a UTC
//! expiry in whole seconds and a non-negative scan ceiling.

pub mod password;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Offset-less layouts, read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Password is required when password protection is enabled")]
    PasswordRequired,

    #[error("Expiration date must be in the future")]
    ExpiryInPast,

    #[error("QR code content must not be empty")]
    EmptyDestination,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

/// Raw `security` object from a create request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityRequest {
    pub is_password_protected: Value,
    pub password: Option<String>,
    pub expires_at: Value,
    pub max_scans: Value,
}

/// Normalised settings, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecuritySettings {
    pub is_password_protected: bool,
    /// Empty unless protected.
    pub password_hash: String,
    pub expires_at: Option<i64>,
    pub max_scans: i64,
}

impl SecurityRequest {
    pub fn normalize(&self, now: i64) -> Result<SecuritySettings, ValidationError> {
        let is_password_protected = truthy(&self.is_password_protected);

        let password_hash = if is_password_protected {
            let password = self.password.as_deref().map(str::trim).unwrap_or_default();
            if password.is_empty() {
                return Err(ValidationError::PasswordRequired);
            }
            password::hash_password(password)
                .map_err(|e| ValidationError::PasswordHash(e.to_string()))?
        } else {
            String::new()
        };

        let expires_at = parse_expiry_value(&self.expires_at);
        if expires_at.is_some_and(|at| at <= now) {
            return Err(ValidationError::ExpiryInPast);
        }

        Ok(SecuritySettings {
            is_password_protected,
            password_hash,
            expires_at,
            max_scans: normalize_max_scans(&self.max_scans),
        })
    }
}

pub fn validate_destination(text: &str) -> Result<&str, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        Err(ValidationError::EmptyDestination)
    } else {
        Ok(text)
    }
}

/// Coerce to a non-negative whole number. Anything non-numeric is 0.
#[allow(clippy::cast_possible_truncation)]
pub fn normalize_max_scans(value: &Value) -> i64 {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        // `as` saturates at i64::MAX.
        Some(n) if n.is_finite() && n > 0.0 => n.floor() as i64,
        _ => 0,
    }
}

/// Parse a timestamp string to unix seconds (UTC), dropping sub-seconds.
///
/// Accepts RFC 3339 and offset-less ISO forms (read as UTC). Returns
/// `None` for anything unparsable.
pub fn parse_expiry(input: &str) -> Option<i64> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.timestamp());
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(naive.and_utc().timestamp());
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp())
}

/// Strings are parsed; numbers are epoch milliseconds.
#[allow(clippy::cast_possible_truncation)]
fn parse_expiry_value(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => parse_expiry(s),
        Value::Number(n) => {
            let millis = n.as_f64().filter(|m| m.is_finite())?;
            DateTime::<Utc>::from_timestamp_millis(millis as i64).map(|dt| dt.timestamp())
        }
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn request(body: Value) -> SecurityRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn empty_body_is_open_and_unlimited() {
        let settings = request(json!({})).normalize(NOW).unwrap();
        assert_eq!(
            settings,
            SecuritySettings {
                is_password_protected: false,
                password_hash: String::new(),
                expires_at: None,
                max_scans: 0,
            }
        );
    }

    #[test]
    fn max_scans_coercion() {
        assert_eq!(normalize_max_scans(&json!(5)), 5);
        assert_eq!(normalize_max_scans(&json!(2.9)), 2);
        assert_eq!(normalize_max_scans(&json!(-3)), 0);
        assert_eq!(normalize_max_scans(&json!("7")), 7);
        assert_eq!(normalize_max_scans(&json!(" 4.5 ")), 4);
        assert_eq!(normalize_max_scans(&json!("lots")), 0);
        assert_eq!(normalize_max_scans(&json!(null)), 0);
        assert_eq!(normalize_max_scans(&json!(true)), 0);
    }

    #[test]
    fn protection_requires_password() {
        let err = request(json!({"isPasswordProtected": true, "password": "   "}))
            .normalize(NOW)
            .unwrap_err();
        assert!(matches!(err, ValidationError::PasswordRequired));

        let err = request(json!({"isPasswordProtected": "yes"}))
            .normalize(NOW)
            .unwrap_err();
        assert!(matches!(err, ValidationError::PasswordRequired));
    }

    #[test]
    fn protected_password_is_hashed() {
        let settings = request(json!({"isPasswordProtected": 1, "password": " hunter2 "}))
            .normalize(NOW)
            .unwrap();
        assert!(settings.is_password_protected);
        assert_ne!(settings.password_hash, "hunter2");
        assert!(password::verify_password("hunter2", &settings.password_hash));
    }

    #[test]
    fn password_dropped_when_unprotected() {
        let settings = request(json!({"isPasswordProtected": false, "password": "ignored"}))
            .normalize(NOW)
            .unwrap();
        assert!(!settings.is_password_protected);
        assert!(settings.password_hash.is_empty());
    }

    #[test]
    fn expiry_is_utc_seconds() {
        assert_eq!(parse_expiry("2030-01-01T00:00:00Z"), Some(1_893_456_000));
        assert_eq!(parse_expiry("2030-01-01T02:00:00+02:00"), Some(1_893_456_000));
        assert_eq!(parse_expiry("2030-01-01T00:00:00.750Z"), Some(1_893_456_000));
        assert_eq!(parse_expiry("2030-01-01T00:00"), Some(1_893_456_000));
        assert_eq!(parse_expiry("2030-01-01"), Some(1_893_456_000));
    }

    #[test]
    fn unparsable_expiry_means_none() {
        assert_eq!(parse_expiry("next tuesday"), None);
        assert_eq!(parse_expiry(""), None);

        let settings = request(json!({"expiresAt": "garbage"})).normalize(NOW).unwrap();
        assert!(settings.expires_at.is_none());
    }

    #[test]
    fn numeric_expiry_is_epoch_millis() {
        let settings = request(json!({"expiresAt": 1_893_456_000_500_i64}))
            .normalize(NOW)
            .unwrap();
        assert_eq!(settings.expires_at, Some(1_893_456_000));
    }

    #[test]
    fn past_expiry_is_rejected() {
        let err = request(json!({"expiresAt": "2001-01-01T00:00:00Z"}))
            .normalize(NOW)
            .unwrap_err();
        assert!(matches!(err, ValidationError::ExpiryInPast));
    }

    #[test]
    fn destination_must_not_be_blank() {
        assert_eq!(validate_destination(" https://a.example ").unwrap(), "https://a.example");
        assert!(matches!(
            validate_destination("  "),
            Err(ValidationError::EmptyDestination)
        ));
    }
}
