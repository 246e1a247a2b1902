use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::evaluation::poller::PollConfig;
use crate::jobs::runner::RetryPolicy;
use crate::llm_client::REQUEST_TIMEOUT_SECS;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Slack added on top of the longest possible job when sizing the claim TTL.
const CLAIM_TTL_MARGIN: Duration = Duration::from_secs(60);

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub port: u16,
    pub rust_log: String,
    pub poll_interval_secs: u64,
    pub poll_max_attempts: u32,
    pub step_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string()),
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            poll_interval_secs: parse_env("EVAL_POLL_INTERVAL_SECS", 2)
                .context("EVAL_POLL_INTERVAL_SECS must be a whole number of seconds")?,
            poll_max_attempts: ensure_positive(
                "EVAL_POLL_MAX_ATTEMPTS",
                parse_env("EVAL_POLL_MAX_ATTEMPTS", 60)
                    .context("EVAL_POLL_MAX_ATTEMPTS must be a positive integer")?,
            )?,
            step_retries: parse_env("EVAL_STEP_RETRIES", 1)
                .context("EVAL_STEP_RETRIES must be a non-negative integer")?,
        })
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.poll_max_attempts,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.step_retries,
            ..RetryPolicy::default()
        }
    }

    /// How long an in-flight claim may live: every attempt of the submit and
    /// poll steps at their worst case, plus a margin.
    pub fn claim_ttl(&self) -> Duration {
        let attempts = self.step_retries.saturating_add(1);
        let request = Duration::from_secs(REQUEST_TIMEOUT_SECS);
        let retry = self.retry_policy();
        let poll_window = self.poll_config().interval * self.poll_max_attempts;
        (request + poll_window + retry.delay) * attempts + request + CLAIM_TTL_MARGIN
    }
}

fn ensure_positive(key: &str, value: u32) -> Result<u32> {
    if value == 0 {
        bail!("'{key}' must be at least 1");
    }
    Ok(value)
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid value '{raw}' for '{key}'")),
        Err(_) => Ok(default),
    }
}
