//! Argon2id password hashing.
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$digest`), so
//! verification reads its parameters from the stored hash. The cost used for
//! new hashes is fixed at startup through [`HashCost`].

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier as _, Version,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use super::CredentialError;

const DUMMY_PASSWORD: &str = "accountd-timing-equalizer";

/// Argon2id cost parameters applied to every new hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl HashCost {
    #[must_use]
    pub const fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }
}

impl Default for HashCost {
    fn default() -> Self {
        Self::new(
            Params::DEFAULT_M_COST,
            Params::DEFAULT_T_COST,
            Params::DEFAULT_P_COST,
        )
    }
}

#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
    // Computed once so lookup misses can burn the same CPU as a real verify.
    dummy_hash: Arc<str>,
}

impl PasswordHasher {
    /// Build a hasher for the given cost.
    ///
    /// # Errors
    /// Returns [`CredentialError::Hashing`] if the cost parameters are out of
    /// range for Argon2.
    pub fn new(cost: HashCost) -> Result<Self, CredentialError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|err| CredentialError::Hashing(err.to_string()))?;

        let dummy_hash = hash_with(&params, DUMMY_PASSWORD.as_bytes())?;

        Ok(Self {
            params,
            dummy_hash: Arc::from(dummy_hash),
        })
    }

    /// Hash a plaintext password with a fresh random salt.
    ///
    /// # Errors
    /// Returns [`CredentialError::Hashing`] on RNG or algorithm failure.
    pub fn hash(&self, password: &SecretString) -> Result<String, CredentialError> {
        hash_with(&self.params, password.expose_secret().as_bytes())
    }

    /// Check a plaintext password against a stored PHC hash.
    ///
    /// `Ok(false)` means the password does not match.
    ///
    /// # Errors
    /// Returns [`CredentialError::InvalidHashFormat`] when the stored hash is
    /// not an Argon2 PHC string.
    pub fn verify(&self, password: &SecretString, hash: &str) -> Result<bool, CredentialError> {
        let parsed = PasswordHash::new(hash).map_err(|_| CredentialError::InvalidHashFormat)?;

        // Argon2::default() is fine here: verify_password uses the params encoded in the hash.
        match Argon2::default().verify_password(password.expose_secret().as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(_) => Err(CredentialError::InvalidHashFormat),
        }
    }

    /// Run a verification that can never succeed, for lookup misses.
    ///
    /// # Errors
    /// Only fails if the internal dummy hash is unreadable, which would be a bug.
    pub fn verify_dummy(&self, password: &SecretString) -> Result<(), CredentialError> {
        self.verify(password, &self.dummy_hash).map(|_| ())
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("m_cost", &self.params.m_cost())
            .field("t_cost", &self.params.t_cost())
            .field("p_cost", &self.params.p_cost())
            .finish_non_exhaustive()
    }
}

fn hash_with(params: &Params, password: &[u8]) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone());

    argon2
        .hash_password(password, &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| CredentialError::Hashing(err.to_string()))
}
