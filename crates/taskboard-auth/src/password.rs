//! Password policy, hashing and verification

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password must be at least {MIN_PASSWORD_LEN} characters and contain at least one number")]
    TooWeak,

    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHashFormat(String),
}

/// Reject passwords shorter than [`MIN_PASSWORD_LEN`] or without a digit
pub fn check_password_strength(password: &str) -> Result<(), PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LEN || !password.chars().any(|c| c.is_ascii_digit())
    {
        return Err(PasswordError::TooWeak);
    }
    Ok(())
}

/// Hash a password with Argon2id and a random salt, returning a PHC string
///
/// ```
/// use taskboard_auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("hunter42").unwrap();
/// assert!(verify_password("hunter42", &hash).unwrap());
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Check a password against a stored PHC hash
///
/// A mismatch is `Ok(false)`; only a malformed hash or an internal failure is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHashFormat(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}
