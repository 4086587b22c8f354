use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://api.spotify.com";
const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
const DEFAULT_HISTORY_URL: &str = "https://1001albumsgenerator.com";

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub project_id: Option<String>,
    pub market: String,
    pub api_url: String,
    pub accounts_url: String,
    pub history_url: String,
    pub rate_limit: RateLimitSettings,
    pub max_retries: u32,
}

/// Outbound call quota for the catalog API
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitSettings {
    pub calls: u32,
    pub period: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            calls: 100,
            period: Duration::from_secs(31),
        }
    }
}

/// Load configuration from `.env` and environment
pub fn load_config() -> Result<Config> {
    // Load `.env` file if present
    dotenv::dotenv().ok();

    let client_id = std::env::var("SPOTIFY_CLIENT_ID").context("SPOTIFY_CLIENT_ID is not set")?;
    let client_secret =
        std::env::var("SPOTIFY_CLIENT_SECRET").context("SPOTIFY_CLIENT_SECRET is not set")?;

    let defaults = RateLimitSettings::default();
    let rate_limit = RateLimitSettings {
        calls: parse_var("CATALOG_RATE_LIMIT_CALLS", defaults.calls)?,
        period: Duration::from_secs(parse_var(
            "CATALOG_RATE_LIMIT_PERIOD_SECS",
            defaults.period.as_secs(),
        )?),
    };

    Ok(Config {
        client_id,
        client_secret,
        project_id: std::env::var("PROJECT_ID").ok(),
        market: var_or("SPOTIFY_MARKET", "US"),
        api_url: var_or("SPOTIFY_API_URL", DEFAULT_API_URL),
        accounts_url: var_or("SPOTIFY_ACCOUNTS_URL", DEFAULT_ACCOUNTS_URL),
        history_url: var_or("HISTORY_BASE_URL", DEFAULT_HISTORY_URL),
        rate_limit,
        max_retries: parse_var("CATALOG_MAX_RETRIES", 3)?,
    })
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{name} has an invalid value: '{raw}'"))
}
