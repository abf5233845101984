//! Credential store: Argon2id with a fresh random salt per hash.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use lions_types::{ForumError, ForumResult};
use tracing::warn;

pub fn hash_password(password: &str) -> ForumResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ForumError::storage(anyhow::anyhow!("password hashing failed: {}", e)))
}

/// Verification goes through Argon2's own comparison. A stored digest that
/// does not parse counts as a mismatch.
pub fn verify_password(digest: &str, password: &str) -> bool {
    let parsed = match PasswordHash::new(digest) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            return false;
        }
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}
