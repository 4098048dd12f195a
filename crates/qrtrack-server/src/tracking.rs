//! Tracking URL issuance.
//!
//! A tracking URL points at the scan endpoint and carries an opaque token
//! per issuance. The token is never validated; it only groups scans by the
//! URL they came through.

use rand::Rng;
use rand::distributions::Alphanumeric;

pub const DEFAULT_TOKEN_LENGTH: usize = 10;

/// Generate a URL-safe random token.
pub fn generate_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len.max(1))
        .map(char::from)
        .collect()
}

/// Build `{base_url}/track/{code_id}/{token}` with a fresh token.
pub fn issue(base_url: &str, code_id: &str) -> String {
    issue_with_length(base_url, code_id, DEFAULT_TOKEN_LENGTH)
}

pub fn issue_with_length(base_url: &str, code_id: &str, token_len: usize) -> String {
    tracking_url(base_url, code_id, &generate_token(token_len))
}

/// Build the tracking URL for a known token.
pub fn tracking_url(base_url: &str, code_id: &str, token: &str) -> String {
    format!("{}/track/{code_id}/{token}", base_url.trim_end_matches('/'))
}
