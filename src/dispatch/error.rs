//! Failure types for candidates, tier races and whole dispatches
//!
//! Candidate and tier failures stay inside the dispatcher and only feed logs
//! and metrics. [`DispatchError`] is the one failure a caller ever sees.

use std::time::Duration;

use thiserror::Error;

/// Message returned to callers when every tier is exhausted. Never names a
/// backend.
pub const BUSY_MESSAGE: &str = "All models are currently busy. Please try again shortly.";

/// Failure of one candidate call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvokeError {
    /// No usable response within the candidate's budget
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Network, DNS or connection failure
    #[error("transport error: {0}")]
    Transport(String),

    /// 2xx response whose body has no usable reply
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Non-2xx status from the gateway
    #[error("upstream error {status}: {message}")]
    Upstream { status: u16, message: String },
}

impl InvokeError {
    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            InvokeError::Timeout(_) => "timeout",
            InvokeError::Transport(_) => "transport_error",
            InvokeError::MalformedResponse(_) => "malformed_response",
            InvokeError::Upstream { .. } => "upstream_error",
        }
    }
}

/// Failure of a whole tier race
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RaceFailure {
    /// Every candidate reported a failure before the budget elapsed
    #[error("all {candidates} candidates in tier '{tier}' failed")]
    AllCandidatesFailed { tier: String, candidates: usize },

    /// The tier budget elapsed with no success
    #[error("tier '{tier}' produced no success within {budget:?}")]
    TierTimeout { tier: String, budget: Duration },
}

impl RaceFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            RaceFailure::AllCandidatesFailed { .. } => "tier_exhausted",
            RaceFailure::TierTimeout { .. } => "tier_timeout",
        }
    }
}

/// Terminal failure of a dispatch
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("all tiers exhausted after racing {tiers_raced} tier(s)")]
    AllTiersExhausted { tiers_raced: usize },
}
