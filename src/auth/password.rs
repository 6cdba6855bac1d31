use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use subtle::ConstantTimeEq;

use crate::error::AppError;

/// Hash a password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Check a password against a stored Argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Whether a stored password is an Argon2 PHC string rather than legacy plaintext.
pub fn is_hashed(stored: &str) -> bool {
    PasswordHash::new(stored).is_ok()
}

/// Check a stored password, hashed or not.
///
/// Rows written before hashing was introduced hold the password as typed,
/// so anything that does not parse as a PHC string is compared verbatim in
/// constant time.
pub fn verify_stored_password(candidate: &str, stored: &str) -> bool {
    if is_hashed(stored) {
        verify_password(candidate, stored)
    } else {
        !stored.is_empty() && bool::from(candidate.as_bytes().ct_eq(stored.as_bytes()))
    }
}
