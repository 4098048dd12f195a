//! Password hashing and verification using argon2id.
//!
//! Passwords are trimmed before hashing and before verification.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

/// Hash a password using argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.trim().as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Check a candidate against a stored hash. An unparsable hash never matches.
pub fn verify_password(candidate: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(candidate.trim().as_bytes(), &parsed)
        .is_ok()
}
