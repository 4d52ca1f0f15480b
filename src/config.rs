use anyhow::{anyhow, Context};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::models::Email;
use crate::planner::RenewalTrigger;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub connect: PgConnectOptions,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    pub run_migrations: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub database: DatabaseConfig,
    pub renewal_trigger: RenewalTrigger,
    pub request_timeout: Duration,
    /// Hex SHA-256 digest of a bearer token, mapped to the email it authenticates.
    pub api_tokens: HashMap<String, Email>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind = parse_or(&var, "QUIZDESK_BIND", SocketAddr::from(([127, 0, 0, 1], 3000)))?;
        let renewal_trigger = match var("QUIZDESK_RENEWAL_TRIGGER") {
            Some(raw) => raw
                .parse::<RenewalTrigger>()
                .map_err(|e| anyhow!(e))
                .context("QUIZDESK_RENEWAL_TRIGGER")?,
            None => RenewalTrigger::Amount,
        };
        let request_timeout = secs(&var, "QUIZDESK_REQUEST_TIMEOUT_SECS", 10)?;

        let connect = match var("DATABASE_URL") {
            Some(url) => PgConnectOptions::from_str(&url).context("invalid DATABASE_URL")?,
            None => {
                let part = |key: &str| {
                    var(key).with_context(|| format!("neither DATABASE_URL nor {} is set", key))
                };
                PgConnectOptions::new()
                    .host(&part("POSTGRESQL_HOST")?)
                    .port(parse_or(&var, "POSTGRESQL_PORT", 5432)?)
                    .username(&part("POSTGRESQL_USER")?)
                    .password(&part("POSTGRESQL_PW")?)
                    .database(&part("POSTGRESQL_DB")?)
                    .ssl_mode(PgSslMode::Require)
            }
        };

        let database = DatabaseConfig {
            connect,
            max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", 10)?,
            min_connections: parse_or(&var, "DB_MIN_CONNECTIONS", 0)?,
            acquire_timeout: secs(&var, "DB_ACQUIRE_TIMEOUT_SECS", 5)?,
            idle_timeout: secs(&var, "DB_IDLE_TIMEOUT_SECS", 300)?,
            max_lifetime: secs(&var, "DB_MAX_LIFETIME_SECS", 1800)?,
            run_migrations: parse_or(&var, "QUIZDESK_RUN_MIGRATIONS", true)?,
        };
        if database.min_connections > database.max_connections {
            return Err(anyhow!(
                "DB_MIN_CONNECTIONS ({}) exceeds DB_MAX_CONNECTIONS ({})",
                database.min_connections,
                database.max_connections
            ));
        }

        let api_tokens = match var("QUIZDESK_API_TOKENS") {
            Some(raw) => parse_tokens(&raw)?,
            None => HashMap::new(),
        };

        Ok(Config {
            bind,
            database,
            renewal_trigger,
            request_timeout,
            api_tokens,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("invalid {} `{}`: {}", key, raw, e)),
        None => Ok(default),
    }
}

fn secs<F>(var: &F, key: &str, default: u64) -> anyhow::Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(var, key, default).map(Duration::from_secs)
}

/// `digest=email,digest=email`
fn parse_tokens(raw: &str) -> anyhow::Result<HashMap<String, Email>> {
    let mut tokens = HashMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (digest, email) = entry
            .split_once('=')
            .with_context(|| format!("QUIZDESK_API_TOKENS entry `{}` has no `=`", entry))?;
        let digest = digest.trim().to_ascii_lowercase();
        if digest.len() != 64 || hex::decode(&digest).is_err() {
            return Err(anyhow!(
                "QUIZDESK_API_TOKENS digest `{}` is not a hex SHA-256",
                digest
            ));
        }
        let email = Email::parse(email)
            .with_context(|| format!("QUIZDESK_API_TOKENS entry `{}` has no email", entry))?;
        tokens.insert(digest, email);
    }
    Ok(tokens)
}
