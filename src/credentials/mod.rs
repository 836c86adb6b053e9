//! Credential primitives: password hashing and session tokens.

pub mod config;
pub mod password;
pub mod token;

pub use self::config::AuthConfig;
pub use self::password::{HashCost, PasswordHasher};
pub use self::token::{
    TokenCodec, TokenError, DEFAULT_TOKEN_TTL_SECONDS, MAX_TOKEN_TTL_SECONDS,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("invalid password hash format")]
    InvalidHashFormat,
    #[error("password hashing failed: {0}")]
    Hashing(String),
}
