//! PostgreSQL-backed [`UserRepository`].

use async_trait::async_trait;
use sqlx::{Connection, PgPool};
use tracing::{info_span, Instrument};

use super::{
    models::{NewUser, User},
    repo::{RepositoryError, UserRepository},
};

const SCHEMA: &str = include_str!("../../sql/schema.sql");

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the idempotent schema bootstrap.
    ///
    /// # Errors
    /// Returns an error if any statement fails.
    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "MIGRATE"
        );
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let query = "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) \
                     RETURNING id, name, email, password_hash, created_at, updated_at";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query_as::<_, User>(query)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .map_err(RepositoryError::from_write)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .map_err(RepositoryError::from_read)
    }

    async fn find_by_id(&self, id: i64) -> Result<User, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .map_err(RepositoryError::from_read)
    }

    async fn update(&self, user: &User) -> Result<User, RepositoryError> {
        let query = "UPDATE users SET name = $1, email = $2, password_hash = $3, updated_at = $4 \
                     WHERE id = $5 \
                     RETURNING id, name, email, password_hash, created_at, updated_at";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        match sqlx::query_as::<_, User>(query)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.updated_at)
            .bind(user.id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
        {
            Ok(Some(row)) => Ok(row),
            Ok(None) => Err(RepositoryError::NotFound),
            Err(err) => Err(RepositoryError::from_write(err)),
        }
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let query = "DELETE FROM users WHERE id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await?;

        if result.rows_affected() == 0 {
            Err(RepositoryError::NotFound)
        } else {
            Ok(())
        }
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let rows = sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .instrument(span)
            .await?;
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }
}
