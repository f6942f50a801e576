use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

/// Process configuration, read once at startup from the environment
/// (with `.env` support via dotenvy in main).
#[derive(Debug, Clone)]
pub struct Settings {
    pub bot_token: String,
    pub database_url: String,
    /// Country tag preferred by the egress selector.
    pub proxy_country: String,
    pub check_interval: Duration,
    pub check_jitter: Duration,
    pub probe_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let bot_token =
            env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN must be set in .env")?;
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://domwatch.db".to_string());
        let proxy_country = env::var("PROXY_COUNTRY").unwrap_or_else(|_| "turkey".to_string());

        Ok(Self {
            bot_token,
            database_url,
            proxy_country,
            check_interval: Duration::from_secs(env_secs("CHECK_INTERVAL_SECS", 300)?),
            check_jitter: Duration::from_secs(env_secs("CHECK_JITTER_SECS", 300)?),
            probe_timeout: Duration::from_secs(env_secs("PROBE_TIMEOUT_SECS", 20)?),
        })
    }
}

fn env_secs(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number of seconds")),
        Err(_) => Ok(default),
    }
}
