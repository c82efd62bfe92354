//! Password hashing for the user system
//!
//! Argon2id with a random per-user salt, stored as a PHC string.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core},
};

use super::errors::UserError;
use crate::Result;

/// Hash a password using Argon2id
///
/// # Returns
/// The PHC-format hash string, salt included.
pub fn hash_password(password: impl AsRef<str>) -> Result<String> {
    let password = password.as_ref();
    if password.is_empty() {
        return Err(UserError::EmptyPassword.into());
    }

    let salt = SaltString::generate(&mut rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| UserError::PasswordHashing {
            reason: e.to_string(),
        })?
        .to_string();

    Ok(hash)
}

/// Verify a password against its hash
///
/// Any failure, including an empty or unparsable stored hash, is
/// [`UserError::Unauthorized`].
pub fn verify_password(password: impl AsRef<str>, password_hash: impl AsRef<str>) -> Result<()> {
    let parsed_hash =
        PasswordHash::new(password_hash.as_ref()).map_err(|_| UserError::Unauthorized)?;

    Argon2::default()
        .verify_password(password.as_ref().as_bytes(), &parsed_hash)
        .map_err(|_| UserError::Unauthorized.into())
}
