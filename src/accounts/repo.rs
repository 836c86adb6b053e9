use async_trait::async_trait;
use thiserror::Error;

use super::models::{NewUser, User};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("unique constraint violated")]
    Duplicate,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage for account records.
///
/// Implementations must enforce email uniqueness themselves and report a
/// collision as [`RepositoryError::Duplicate`], so concurrent registrations
/// cannot both succeed.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<User, RepositoryError>;

    /// Persist `name`, `email`, `password_hash` and `updated_at` of `user`.
    async fn update(&self, user: &User) -> Result<User, RepositoryError>;

    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;

    async fn list(&self) -> Result<Vec<User>, RepositoryError>;

    /// Cheap liveness probe for `/health`.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

impl RepositoryError {
    /// Classify a sqlx error coming from a write.
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            Self::Duplicate
        } else {
            Self::Database(err)
        }
    }

    /// Classify a sqlx error coming from a single-row read.
    pub(crate) fn from_read(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            other => Self::Database(other),
        }
    }
}
