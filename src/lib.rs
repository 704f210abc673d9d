//! Tiered Relay - latency-first chat relay for LLM backends
//!
//! Races every model of a latency tier in parallel, keeps the first complete
//! answer and falls back to the next tier when a whole tier fails or runs
//! out of time.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod docs;
pub mod error;
pub mod prompt;
pub mod proxy;
pub mod routes;
pub mod streaming;
pub mod tiers;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

pub use crate::config::Config;
pub use crate::context::{ContextSource, SearchClient, StaticContext};
pub use crate::dispatch::{Dispatcher, ModelInvoker};
pub use crate::proxy::GatewayClient;

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    /// Tiered race-and-fallback dispatcher over the model gateway
    pub dispatcher: Dispatcher,
    /// Background context for the system preamble
    pub context: Arc<dyn ContextSource>,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let invoker: Arc<dyn ModelInvoker> =
            Arc::new(GatewayClient::new(http_client.clone(), &config)?);

        let context: Arc<dyn ContextSource> = if config.search_enabled {
            Arc::new(SearchClient::new(http_client, &config))
        } else {
            Arc::new(StaticContext::default())
        };

        Ok(Self::from_parts(config, invoker, context))
    }

    /// Assemble state from already-built collaborators
    pub fn from_parts(
        config: Config,
        invoker: Arc<dyn ModelInvoker>,
        context: Arc<dyn ContextSource>,
    ) -> Self {
        let dispatcher = Dispatcher::new(invoker, config.tiers.clone(), config.dispatch_ceiling);

        Self {
            config,
            start_time: Instant::now(),
            dispatcher,
            context,
        }
    }
}
