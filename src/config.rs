use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub jwt_secret: String,
    /// `None` runs on the in-memory store.
    pub database_url: Option<String>,
    pub access_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub log_dir: String,
    pub log_level: tracing::Level,

    pub allow_redecide_rejected: bool,

    pub bootstrap_admin: Option<(String, String)>,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .with_context(|| format!("{key} has an invalid value: {raw:?}"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let bootstrap_admin = match (
            optional("BOOTSTRAP_ADMIN_USERNAME"),
            optional("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            jwt_secret: required("JWT_SECRET")?,
            database_url: optional("DATABASE_URL"),
            access_token_ttl: parsed("ACCESS_TOKEN_TTL", "900")?, // default 15 min

            rate_login_per_min: parsed("RATE_LOGIN_PER_MIN", "60")?,
            rate_protected_per_min: parsed("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/ems".to_string()),

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: parsed("LOG_LEVEL", "debug")?,

            allow_redecide_rejected: parsed("ALLOW_REDECIDE_REJECTED", "false")?,

            bootstrap_admin,
        })
    }
}
