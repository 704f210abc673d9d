//! Instant-answer search client
//!
//! Queries a DuckDuckGo-style instant answer endpoint and returns its
//! `AbstractText` as context.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{ContextSource, DEFAULT_CONTEXT};
use crate::config::Config;
use crate::routes::metrics::record_context_lookup;

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
}

/// Search API client
pub struct SearchClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl SearchClient {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            url: config.search_api_url.clone(),
            timeout: config.search_timeout,
        }
    }

    async fn fetch(&self, query: &str) -> Result<Option<String>, reqwest::Error> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("q", query), ("format", "json"), ("no_html", "1")])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;

        let answer: InstantAnswer = response.json().await?;
        let text = answer.abstract_text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

#[async_trait]
impl ContextSource for SearchClient {
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    async fn lookup(&self, query: &str) -> String {
        match self.fetch(query).await {
            Ok(Some(snippet)) => {
                debug!(snippet_len = snippet.len(), "Search returned a snippet");
                record_context_lookup("hit");
                snippet
            }
            Ok(None) => {
                debug!("Search returned no snippet");
                record_context_lookup("miss");
                DEFAULT_CONTEXT.to_string()
            }
            Err(e) => {
                let result = if e.is_timeout() { "timeout" } else { "error" };
                warn!(error = %e, result, "Search lookup failed, using default context");
                record_context_lookup(result);
                DEFAULT_CONTEXT.to_string()
            }
        }
    }
}
