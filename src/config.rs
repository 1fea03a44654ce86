//! Configuration management

use std::str::FromStr;
use std::time::Duration;

use anyhow::{self, Context, Result};

use crate::defaults::{
    DEFAULT_DIRECTIONS_TIMEOUT_SECS, DEFAULT_MAX_RETRIES, DEFAULT_NATS_URL,
    DEFAULT_ROUTE_REFRESH_SECS, DEFAULT_SPEED_MPH,
};
use crate::services::routing::ProviderKind;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// Directions provider settings
    pub directions: DirectionsConfig,

    /// How often a live navigation session re-fetches its route
    pub route_refresh_interval: Duration,
}

/// Directions provider settings
#[derive(Clone)]
pub struct DirectionsConfig {
    pub provider: ProviderKind,

    /// Provider API key (optional, every route is a straight-line fallback without it)
    pub api_key: Option<String>,

    /// Override for the provider's public endpoint
    pub base_url: Option<String>,

    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,

    pub max_retries: u32,

    /// Speed assumed by straight-line estimates
    pub default_speed_mph: f64,
}

// Keep the key out of logs
impl std::fmt::Debug for DirectionsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectionsConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("default_speed_mph", &self.default_speed_mph)
            .finish()
    }
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenRouteService,
            api_key: None,
            base_url: None,
            timeout_secs: DEFAULT_DIRECTIONS_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            default_speed_mph: DEFAULT_SPEED_MPH,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let nats_url = var("NATS_URL").unwrap_or_else(|| DEFAULT_NATS_URL.to_string());

        let provider = match var("DIRECTIONS_PROVIDER") {
            Some(value) => value.parse().context("Invalid DIRECTIONS_PROVIDER")?,
            None => ProviderKind::OpenRouteService,
        };

        let timeout_secs = parse_or(&var, "DIRECTIONS_TIMEOUT_SECS", DEFAULT_DIRECTIONS_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            anyhow::bail!("DIRECTIONS_TIMEOUT_SECS must be greater than zero");
        }

        let max_retries = parse_or(&var, "DIRECTIONS_MAX_RETRIES", DEFAULT_MAX_RETRIES)?;

        let default_speed_mph = parse_or(&var, "DEFAULT_SPEED_MPH", DEFAULT_SPEED_MPH)?;
        if !default_speed_mph.is_finite() || default_speed_mph <= 0.0 {
            anyhow::bail!("DEFAULT_SPEED_MPH must be a positive number (got {})", default_speed_mph);
        }

        let refresh_secs = parse_or(&var, "ROUTE_REFRESH_SECS", DEFAULT_ROUTE_REFRESH_SECS)?;
        if refresh_secs == 0 {
            anyhow::bail!("ROUTE_REFRESH_SECS must be greater than zero");
        }

        let api_key = var("DIRECTIONS_API_KEY");
        if api_key.is_none() {
            tracing::warn!("⚠ DIRECTIONS_API_KEY not set, all routes will be straight-line estimates");
        }

        Ok(Self {
            nats_url,
            directions: DirectionsConfig {
                provider,
                api_key,
                base_url: var("DIRECTIONS_BASE_URL"),
                timeout_secs,
                max_retries,
                default_speed_mph,
            },
            route_refresh_interval: Duration::from_secs(refresh_secs),
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number (got '{}')", key, raw)),
        None => Ok(default),
    }
}
