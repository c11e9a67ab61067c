//! Password hashing and verification using Argon2
//!
//! Stored credentials are PHC-formatted Argon2id strings. Verification reads
//! the parameters and salt out of the stored string and relies on argon2's
//! constant-time digest comparison.

use argon2::{
    password_hash::{
        self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier as _, SaltString,
    },
    Argon2,
};

use crate::types::ServiceError;

/// Compares supplied passwords against stored Argon2 hashes.
///
/// Holds no per-call state; a single instance is shared by the gateway.
#[derive(Clone, Default)]
pub struct PasswordVerifier {
    argon2: Argon2<'static>,
}

impl PasswordVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash a password, returning the PHC string (salt and parameters included).
    pub fn hash(&self, password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::Auth(format!("Failed to hash password: {e}")))
    }

    /// Check `password` against `stored_hash`.
    ///
    /// `Ok(false)` is a credential mismatch. `Err` means the stored hash itself
    /// is unusable, which is a data defect rather than a failed login.
    pub fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, ServiceError> {
        let parsed_hash = PasswordHash::new(stored_hash)
            .map_err(|e| ServiceError::Auth(format!("Invalid password hash format: {e}")))?;

        // argon2 reports a missing salt or digest as a mismatch
        if parsed_hash.salt.is_none() || parsed_hash.hash.is_none() {
            return Err(ServiceError::Auth(
                "Stored password hash has no salt or digest".into(),
            ));
        }

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(ServiceError::Auth(format!("Unusable password hash: {e}"))),
        }
    }
}
