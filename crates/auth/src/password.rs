//! Credential hashing seam.
//!
//! Login and seeding only ever call `hash` and `verify`; the algorithm lives
//! behind [`CredentialHasher`] so tests and other deployments can swap it.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordHashError {
    #[error("password hashing failed: {0}")]
    Hash(String),
}

pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordHashError>;

    /// `false` for a wrong password and for an unparseable stored hash.
    fn verify(&self, plaintext: &str, hash: &str) -> bool;
}

/// Argon2id with default parameters, PHC string output.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    pub fn new() -> Self {
        Self
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PasswordHashError::Hash(e.to_string()))
    }

    fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            tracing::warn!("stored credential is not a valid PHC string");
            return false;
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}
