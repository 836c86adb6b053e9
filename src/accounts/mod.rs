//! Account records, storage, and the workflows built on top of them.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod repo;
pub mod service;

pub use self::memory::MemoryUserRepository;
pub use self::postgres::PgUserRepository;
pub use self::repo::{RepositoryError, UserRepository};
pub use self::service::{AccountError, AccountService};
