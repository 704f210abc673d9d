//! Context lookup
//!
//! Fetches a short background snippet for the caller's latest message. The
//! snippet is folded into the system preamble. Lookups never fail the
//! request: any problem yields [`DEFAULT_CONTEXT`].

pub mod search;

use async_trait::async_trait;

pub use search::SearchClient;

/// Context used when no snippet is available
pub const DEFAULT_CONTEXT: &str = "No search snippet found.";

/// Source of background context for a query
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Look up context for `query`. Always returns usable text.
    async fn lookup(&self, query: &str) -> String;
}

/// Context source that always answers with the same text
pub struct StaticContext(pub String);

impl Default for StaticContext {
    fn default() -> Self {
        Self(DEFAULT_CONTEXT.to_string())
    }
}

#[async_trait]
impl ContextSource for StaticContext {
    async fn lookup(&self, _query: &str) -> String {
        self.0.clone()
    }
}
