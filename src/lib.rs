//! accountd: user accounts over HTTP with Argon2id passwords and JWT session cookies.

pub mod accounts;
pub mod api;
pub mod cli;
pub mod credentials;

pub use api::GIT_COMMIT_HASH;
