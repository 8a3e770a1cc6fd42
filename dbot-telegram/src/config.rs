//! Bot configuration loaded from environment variables.
//!
//! `BOT_TOKEN` (overridable by the caller), `TELEGRAM_API_URL`, `DATABASE_URL`, `DATABASE_AUTH`,
//! `LOG_FILE`, `POLL_TIMEOUT`, `IGNORE_CURRENT_BATCH`.

use anyhow::{Context, Result};
use std::env;

use crate::api::DEFAULT_API_URL;

pub const DEFAULT_POLL_TIMEOUT: u64 = 100;

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    /// Bot API base URL; point it at a mock server in tests.
    pub telegram_api_url: String,
    /// Document store base URL.
    pub database_url: String,
    /// Document store credential, sent as the `auth` query parameter when non-empty.
    pub database_auth: String,
    pub log_file: Option<String>,
    /// Long-poll wait in seconds; 0 means short polling.
    pub poll_timeout: u64,
    /// Drain updates queued while offline without dispatching them.
    pub ignore_current_batch: bool,
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

impl BotConfig {
    /// Loads from the environment. `token`, when given, overrides `BOT_TOKEN`.
    pub fn load(token: Option<String>) -> Result<Self> {
        let bot_token = match token {
            Some(token) => token,
            None => env::var("BOT_TOKEN").context("BOT_TOKEN not set")?,
        };
        let telegram_api_url =
            env::var("TELEGRAM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;
        let database_auth = env::var("DATABASE_AUTH").unwrap_or_default();
        let log_file = env::var("LOG_FILE").ok().filter(|s| !s.is_empty());
        let poll_timeout = match env::var("POLL_TIMEOUT") {
            Ok(s) => s
                .trim()
                .parse()
                .with_context(|| format!("POLL_TIMEOUT is not a number of seconds: {}", s))?,
            Err(_) => DEFAULT_POLL_TIMEOUT,
        };
        let ignore_current_batch = match env::var("IGNORE_CURRENT_BATCH") {
            Ok(s) => parse_bool(&s)
                .with_context(|| format!("IGNORE_CURRENT_BATCH is not a boolean: {}", s))?,
            Err(_) => false,
        };

        Ok(Self {
            bot_token,
            telegram_api_url,
            database_url,
            database_auth,
            log_file,
            poll_timeout,
            ignore_current_batch,
        })
    }

    /// Checks the config before anything connects.
    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            anyhow::bail!("bot token is empty");
        }
        if reqwest::Url::parse(&self.telegram_api_url).is_err() {
            anyhow::bail!("TELEGRAM_API_URL is not a valid URL: {}", self.telegram_api_url);
        }
        if reqwest::Url::parse(&self.database_url).is_err() {
            anyhow::bail!("DATABASE_URL is not a valid URL: {}", self.database_url);
        }
        Ok(())
    }
}
