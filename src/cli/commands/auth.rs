use clap::{Arg, ArgMatches, Command};
use secrecy::{ExposeSecret, SecretString};

use crate::credentials::{config::MIN_TOKEN_SECRET_BYTES, HashCost, MAX_TOKEN_TTL_SECONDS};

pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";
pub const ARG_ARGON2_MEMORY_KIB: &str = "argon2-memory-kib";
pub const ARG_ARGON2_ITERATIONS: &str = "argon2-iterations";
pub const ARG_ARGON2_PARALLELISM: &str = "argon2-parallelism";

#[derive(Debug)]
pub struct Options {
    pub token_secret: SecretString,
    pub token_ttl_seconds: i64,
    pub hash_cost: HashCost,
}

impl Options {
    /// Parse token and hashing arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the secret is missing or shorter than 32 bytes, or
    /// if the TTL is not in `1..=MAX_TOKEN_TTL_SECONDS`.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let token_secret = matches
            .get_one::<String>(ARG_TOKEN_SECRET)
            .cloned()
            .map(SecretString::from)
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_TOKEN_SECRET}"))?;

        if token_secret.expose_secret().len() < MIN_TOKEN_SECRET_BYTES {
            anyhow::bail!("--{ARG_TOKEN_SECRET} must be at least {MIN_TOKEN_SECRET_BYTES} bytes");
        }

        let token_ttl_seconds = matches
            .get_one::<i64>(ARG_TOKEN_TTL_SECONDS)
            .copied()
            .unwrap_or(crate::credentials::DEFAULT_TOKEN_TTL_SECONDS);

        if token_ttl_seconds <= 0 {
            anyhow::bail!("--{ARG_TOKEN_TTL_SECONDS} must be greater than zero");
        }
        if token_ttl_seconds > MAX_TOKEN_TTL_SECONDS {
            anyhow::bail!(
                "--{ARG_TOKEN_TTL_SECONDS} must be at most {MAX_TOKEN_TTL_SECONDS} (365 days)"
            );
        }

        let defaults = HashCost::default();
        let read_u32 = |id: &str, default: u32| matches.get_one::<u32>(id).copied().unwrap_or(default);

        Ok(Self {
            token_secret,
            token_ttl_seconds,
            hash_cost: HashCost::new(
                read_u32(ARG_ARGON2_MEMORY_KIB, defaults.memory_kib),
                read_u32(ARG_ARGON2_ITERATIONS, defaults.iterations),
                read_u32(ARG_ARGON2_PARALLELISM, defaults.parallelism),
            ),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    with_hash_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("HMAC secret used to sign session tokens (at least 32 bytes)")
                .env("ACCOUNTD_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Session token and cookie TTL in seconds")
                .env("ACCOUNTD_TOKEN_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_hash_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ARGON2_MEMORY_KIB)
                .long(ARG_ARGON2_MEMORY_KIB)
                .help("Argon2id memory cost in KiB")
                .env("ACCOUNTD_ARGON2_MEMORY_KIB")
                .default_value("19456")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_ARGON2_ITERATIONS)
                .long(ARG_ARGON2_ITERATIONS)
                .help("Argon2id iterations")
                .env("ACCOUNTD_ARGON2_ITERATIONS")
                .default_value("2")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_ARGON2_PARALLELISM)
                .long(ARG_ARGON2_PARALLELISM)
                .help("Argon2id degree of parallelism")
                .env("ACCOUNTD_ARGON2_PARALLELISM")
                .default_value("1")
                .value_parser(clap::value_parser!(u32)),
        )
}
