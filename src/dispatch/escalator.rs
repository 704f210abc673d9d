//! Tier escalator
//!
//! Walks the configured tiers front to back, racing one tier at a time, and
//! stops at the first tier that produces a winner.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info, warn};

use super::error::DispatchError;
use super::invoker::{ModelInvoker, Reply};
use super::race;
use crate::prompt::Prompt;
use crate::routes::metrics::record_escalation;
use crate::tiers::TierSet;

/// Position of a dispatch in the tier walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Nothing raced yet
    Pending,
    /// Racing the tier at this index
    Racing(usize),
    /// The tier at this index produced the winner
    Succeeded(usize),
    /// Every tier failed (or the ceiling ran out)
    Exhausted,
}

impl DispatchState {
    /// Advance after the current step resolved.
    ///
    /// `tier_succeeded` is ignored outside `Racing`. Terminal states are
    /// absorbing.
    pub fn next(self, tier_count: usize, tier_succeeded: bool) -> Self {
        match self {
            DispatchState::Pending if tier_count == 0 => DispatchState::Exhausted,
            DispatchState::Pending => DispatchState::Racing(0),
            DispatchState::Racing(index) if tier_succeeded => DispatchState::Succeeded(index),
            DispatchState::Racing(index) if index + 1 < tier_count => {
                DispatchState::Racing(index + 1)
            }
            DispatchState::Racing(_) => DispatchState::Exhausted,
            terminal => terminal,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DispatchState::Succeeded(_) | DispatchState::Exhausted)
    }
}

/// Budget for the next tier: its own budget, clipped to what is left of the
/// dispatch ceiling. `None` once the ceiling is spent.
pub(crate) fn effective_budget(tier_budget: Duration, deadline: Instant) -> Option<Duration> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        None
    } else {
        Some(tier_budget.min(remaining))
    }
}

/// Tiered race-and-fallback dispatcher.
///
/// Holds only immutable configuration; every dispatch starts from scratch.
#[derive(Clone)]
pub struct Dispatcher {
    pub(crate) invoker: Arc<dyn ModelInvoker>,
    pub(crate) tiers: Arc<TierSet>,
    pub(crate) ceiling: Duration,
}

impl Dispatcher {
    /// Create a dispatcher over `tiers` with an overall per-dispatch ceiling
    pub fn new(invoker: Arc<dyn ModelInvoker>, tiers: TierSet, ceiling: Duration) -> Self {
        Self {
            invoker,
            tiers: Arc::new(tiers),
            ceiling,
        }
    }

    pub fn tiers(&self) -> &TierSet {
        &self.tiers
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Dispatch a prompt and wait for the first complete reply.
    pub async fn dispatch(&self, prompt: &Prompt) -> Result<Reply, DispatchError> {
        self.walk_tiers(prompt).await.1
    }

    /// Tier walk behind [`Dispatcher::dispatch`], returning the terminal state
    pub(crate) async fn walk_tiers(
        &self,
        prompt: &Prompt,
    ) -> (DispatchState, Result<Reply, DispatchError>) {
        let deadline = Instant::now() + self.ceiling;
        let tiers = self.tiers.tiers();
        let mut state = DispatchState::Pending.next(tiers.len(), false);
        let mut tiers_raced = 0;

        while let DispatchState::Racing(index) = state {
            let tier = &tiers[index];
            let Some(budget) = effective_budget(tier.budget, deadline) else {
                warn!(
                    tier = %tier.name,
                    ceiling_ms = self.ceiling.as_millis() as u64,
                    "Dispatch ceiling spent, skipping remaining tiers"
                );
                state = DispatchState::Exhausted;
                break;
            };

            tiers_raced += 1;
            match race::race(&self.invoker, tier, prompt, budget).await {
                Ok(reply) => {
                    state = state.next(tiers.len(), true);
                    info!(
                        tier = %tier.name,
                        tier_index = index,
                        model = %reply.model,
                        state = ?state,
                        "Tier produced a reply"
                    );
                    return (state, Ok(reply));
                }
                Err(failure) => {
                    state = state.next(tiers.len(), false);
                    if let DispatchState::Racing(next) = state {
                        warn!(
                            tier = %tier.name,
                            next_tier = %tiers[next].name,
                            reason = %failure,
                            "Tier failed, escalating"
                        );
                        record_escalation(&tier.name, failure.kind());
                    } else {
                        warn!(tier = %tier.name, reason = %failure, "Last tier failed");
                    }
                }
            }
        }

        error!(tiers_raced, state = ?state, "All tiers exhausted");
        (state, Err(DispatchError::AllTiersExhausted { tiers_raced }))
    }
}
