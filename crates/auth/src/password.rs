//! Password hashing (Argon2id, PHC strings).
//!
//! Hashing and verification are deliberately expensive. Both run on the
//! blocking pool so a login never stalls unrelated requests on the same
//! worker thread. Results are never cached.

use argon2::{Algorithm, Argon2, Params, PasswordHasher as _, PasswordVerifier as _, Version};
use password_hash::{PasswordHash, SaltString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to gather salt entropy: {0}")]
    Entropy(#[source] getrandom::Error),

    #[error("password hashing failed: {0}")]
    Hash(password_hash::Error),

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(password_hash::Error),

    #[error("invalid argon2 parameters: {0}")]
    Params(argon2::Error),

    #[error("hashing task did not complete: {0}")]
    Task(#[source] tokio::task::JoinError),
}

/// Cost profile for new hashes. Verification always uses the parameters
/// embedded in the stored hash.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum HashCost {
    /// Argon2 crate defaults (memory-hard, production).
    #[default]
    Default,
    /// Minimal parameters for tests and local development only.
    Fast,
}

/// Stateless salted hash/verify pair.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(cost: HashCost) -> Result<Self, PasswordError> {
        let params = match cost {
            HashCost::Default => Params::default(),
            HashCost::Fast => Params::new(Params::MIN_M_COST, 1, 1, None).map_err(PasswordError::Params)?,
        };
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt.
    pub fn hash_blocking(&self, password: &str) -> Result<String, PasswordError> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(PasswordError::Entropy)?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(PasswordError::Hash)?;
        let phc = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(PasswordError::Hash)?
            .to_string();
        Ok(phc)
    }

    /// Compare a password against a stored PHC hash in constant time.
    ///
    /// Returns `Ok(false)` on mismatch; errors are reserved for hashes that
    /// cannot be parsed or computed.
    pub fn verify_blocking(&self, password: &str, phc: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(phc).map_err(PasswordError::MalformedHash)?;
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::Hash(e)),
        }
    }

    pub async fn hash(&self, password: String) -> Result<String, PasswordError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash_blocking(&password))
            .await
            .map_err(PasswordError::Task)?
    }

    pub async fn verify(&self, password: String, phc: String) -> Result<bool, PasswordError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify_blocking(&password, &phc))
            .await
            .map_err(PasswordError::Task)?
    }
}
