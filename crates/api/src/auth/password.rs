//! Argon2id password hashing behind the [`CredentialHasher`] seam.
//!
//! Digests use the PHC string format, so the algorithm parameters and salt
//! travel with the hash itself.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

pub type HashError = argon2::password_hash::Error;

/// One-way credential digest.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, HashError>;

    /// `Ok(false)` for a mismatch; `Err` only for a malformed digest.
    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, HashError>;
}

/// Argon2id with default parameters and a random salt per hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(plaintext.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(digest)?;
        match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
