/// Password Hashing and Verification
///
/// bcrypt with a fresh 16-byte salt per hash. The output is the usual modular
/// crypt string (`$2b$<cost>$<salt><digest>`), so the cost and salt travel
/// with the digest and verification needs nothing else.
///
/// bcrypt only reads the first 72 bytes of its input. Longer passwords are
/// refused by `hash` and never match in `verify`, so two passwords sharing a
/// 72-byte prefix cannot stand in for each other.

use bcrypt::{hash_with_salt, verify};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{AppError, ValidationError};

pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;
/// Longest password bcrypt hashes without truncation, in bytes
pub const MAX_PASSWORD_BYTES: usize = 72;

const SALT_LENGTH: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password with a fresh random salt
    ///
    /// # Errors
    /// Returns error if the password exceeds `MAX_PASSWORD_BYTES`, the cost
    /// is out of range or bcrypt fails
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(ValidationError::TooLong("password".to_string(), MAX_PASSWORD_BYTES).into());
        }

        let mut salt = [0u8; SALT_LENGTH];
        OsRng.fill_bytes(&mut salt);

        hash_with_salt(password, self.cost, salt)
            .map(|parts| parts.to_string())
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a stored digest
    ///
    /// A digest that cannot be parsed counts as a mismatch.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        if password.len() > MAX_PASSWORD_BYTES {
            return false;
        }
        match verify(password, digest) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password digest is malformed");
                false
            }
        }
    }

    /// `hash` on the blocking pool
    pub async fn hash_blocking(&self, password: String) -> Result<String, AppError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
    }

    /// `verify` on the blocking pool
    pub async fn verify_blocking(&self, password: String, digest: String) -> Result<bool, AppError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))
    }
}
