//! Route handlers for the account API.

pub mod auth;
pub mod error;
pub mod health;
pub mod types;
pub mod user_login;
pub mod user_register;
pub mod users;
