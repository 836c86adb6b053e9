use crate::{
    accounts::{AccountService, PgUserRepository},
    api,
    credentials::{AuthConfig, HashCost},
};
use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub token_secret: SecretString,
    pub token_ttl_seconds: i64,
    pub hash_cost: HashCost,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the DSN is invalid, the database is unreachable, the
/// schema cannot be applied, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let dsn = parse_dsn(&args.dsn)?;
    log_startup_args(&args, &dsn);

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn.as_str())
        .await
        .context("Failed to connect to database")?;

    let repo = PgUserRepository::new(pool);
    repo.migrate()
        .await
        .context("Failed to apply database schema")?;

    let config = AuthConfig::new(args.token_secret)
        .with_token_ttl_seconds(args.token_ttl_seconds)
        .with_hash_cost(args.hash_cost);
    debug!("Auth config: {:?}", config);

    let service = AccountService::new(Arc::new(repo), &config)
        .context("Invalid password hashing parameters")?;

    api::new(args.port, Arc::new(service)).await
}

fn parse_dsn(dsn: &str) -> Result<Url> {
    let url = Url::parse(dsn).context("Invalid database connection string")?;
    match url.scheme() {
        "postgres" | "postgresql" => Ok(url),
        scheme => bail!("Unsupported database scheme: {scheme}"),
    }
}

fn log_startup_args(args: &Args, dsn: &Url) {
    // Never log the DSN password.
    let mut redacted = dsn.clone();
    if redacted.password().is_some() {
        let _ = redacted.set_password(Some("***"));
    }

    info!(
        port = args.port,
        dsn = %redacted,
        token_ttl_seconds = args.token_ttl_seconds,
        argon2_memory_kib = args.hash_cost.memory_kib,
        argon2_iterations = args.hash_cost.iterations,
        argon2_parallelism = args.hash_cost.parallelism,
        "Starting accountd"
    );
}
