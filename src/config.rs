//! Configuration management for the relay
//!
//! Configuration is loaded from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::tiers::TierSet;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Model gateway base URL (OpenAI-compatible)
    pub gateway_api_url: String,
    /// Model gateway API key
    pub gateway_api_key: String,
    /// Optional `X-Title` header sent to the gateway
    pub gateway_app_title: Option<String>,

    /// Instant-answer search endpoint used for context
    pub search_api_url: String,
    /// Whether the context lookup runs at all
    pub search_enabled: bool,
    /// Upper bound on the context lookup
    pub search_timeout: Duration,

    /// Wall-clock ceiling for one whole dispatch
    pub dispatch_ceiling: Duration,
    /// Ordered tier list
    pub tiers: TierSet,
    /// Name used in the system preamble
    pub assistant_name: String,

    /// Sampling temperature when the request does not carry one
    pub default_temperature: Option<f64>,
    /// Reply length cap when the request does not carry one
    pub default_max_tokens: Option<u32>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let tiers = match lookup("RELAY_TIERS") {
            Some(json) => TierSet::from_json(&json).context("Invalid RELAY_TIERS")?,
            None => TierSet::default(),
        };

        Ok(Self {
            host: var("RELAY_HOST", "0.0.0.0"),
            port: var("RELAY_PORT", "8080")
                .parse()
                .context("Invalid RELAY_PORT")?,

            gateway_api_url: var("GATEWAY_API_URL", "https://openrouter.ai/api/v1"),
            gateway_api_key: lookup("GATEWAY_API_KEY")
                .filter(|key| !key.is_empty())
                .context("GATEWAY_API_KEY must be set")?,
            gateway_app_title: lookup("GATEWAY_APP_TITLE").filter(|t| !t.is_empty()),

            search_api_url: var("SEARCH_API_URL", "https://api.duckduckgo.com/"),
            search_enabled: matches!(var("SEARCH_ENABLED", "true").as_str(), "true" | "1"),
            search_timeout: Duration::from_millis(
                var("SEARCH_TIMEOUT_MS", "3000")
                    .parse()
                    .context("Invalid SEARCH_TIMEOUT_MS")?,
            ),

            dispatch_ceiling: Duration::from_millis(
                var("DISPATCH_CEILING_MS", "30000")
                    .parse()
                    .context("Invalid DISPATCH_CEILING_MS")?,
            ),
            tiers,
            assistant_name: var("ASSISTANT_NAME", "Relay"),

            default_temperature: optional(&lookup, "DEFAULT_TEMPERATURE")?,
            default_max_tokens: optional(&lookup, "DEFAULT_MAX_TOKENS")?,
        })
    }
}

fn optional<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<T>())
        .transpose()
        .with_context(|| format!("Invalid {}", key))
}
