use secrecy::SecretString;

use super::{password::HashCost, token::DEFAULT_TOKEN_TTL_SECONDS};

/// Minimum length of the token signing secret, in bytes.
pub const MIN_TOKEN_SECRET_BYTES: usize = 32;

/// Startup-time credential settings, built once from CLI/env.
pub struct AuthConfig {
    token_secret: SecretString,
    token_ttl_seconds: i64,
    hash_cost: HashCost,
}

impl AuthConfig {
    #[must_use]
    pub fn new(token_secret: SecretString) -> Self {
        Self {
            token_secret,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            hash_cost: HashCost::default(),
        }
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_hash_cost(mut self, cost: HashCost) -> Self {
        self.hash_cost = cost;
        self
    }

    #[must_use]
    pub fn token_secret(&self) -> &SecretString {
        &self.token_secret
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    #[must_use]
    pub fn hash_cost(&self) -> HashCost {
        self.hash_cost
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &"***")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("hash_cost", &self.hash_cost)
            .finish()
    }
}
