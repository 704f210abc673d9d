//! Tier racer
//!
//! Launches every candidate of a tier at once and resolves with the first
//! success. The race owns its candidates in a [`JoinSet`]: resolving the race
//! drops the set, which aborts every call still in flight.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn, Instrument, Span};

use super::error::{InvokeError, RaceFailure};
use super::invoker::{self, ModelInvoker, Reply, StreamStart};
use crate::prompt::Prompt;
use crate::routes::metrics::record_candidate;
use crate::tiers::{ModelId, Tier};

/// Race a tier's candidates as buffered completions.
pub async fn race(
    invoker: &Arc<dyn ModelInvoker>,
    tier: &Tier,
    prompt: &Prompt,
    budget: Duration,
) -> Result<Reply, RaceFailure> {
    race_with(tier, budget, |model| {
        let invoker = Arc::clone(invoker);
        let prompt = prompt.clone();
        async move { invoker::invoke(invoker.as_ref(), &model, &prompt, budget).await }
    })
    .await
}

/// Race a tier's candidates as streams; the first to emit content wins.
pub async fn race_first_chunk(
    invoker: &Arc<dyn ModelInvoker>,
    tier: &Tier,
    prompt: &Prompt,
    budget: Duration,
) -> Result<StreamStart, RaceFailure> {
    race_with(tier, budget, |model| {
        let invoker = Arc::clone(invoker);
        let prompt = prompt.clone();
        async move { invoker::first_chunk(invoker.as_ref(), &model, &prompt, budget).await }
    })
    .await
}

/// Run `launch` for every model in the tier and keep the first `Ok`.
///
/// Completions are consumed by this one loop, so the winner is decided
/// exactly once: the first success observed by `join_next`. Everything
/// after that point is discarded with the set.
async fn race_with<T, F, Fut>(tier: &Tier, budget: Duration, launch: F) -> Result<T, RaceFailure>
where
    T: Send + 'static,
    F: Fn(ModelId) -> Fut,
    Fut: Future<Output = Result<T, InvokeError>> + Send + 'static,
{
    let deadline = Instant::now() + budget;
    let mut candidates = JoinSet::new();

    for model in &tier.models {
        let call = launch(model.clone());
        let model = model.clone();
        candidates.spawn(async move { (model, call.await) }.instrument(Span::current()));
    }

    debug!(
        tier = %tier.name,
        candidates = tier.models.len(),
        budget_ms = budget.as_millis() as u64,
        "Tier race started"
    );

    let mut failed = 0usize;
    loop {
        match timeout_at(deadline, candidates.join_next()).await {
            Err(_) => {
                warn!(
                    tier = %tier.name,
                    failed,
                    outstanding = candidates.len(),
                    budget_ms = budget.as_millis() as u64,
                    "Tier budget elapsed with no successful candidate"
                );
                for _ in 0..candidates.len() {
                    record_candidate(&tier.name, "timeout");
                }
                return Err(RaceFailure::TierTimeout {
                    tier: tier.name.clone(),
                    budget,
                });
            }
            Ok(None) => {
                return Err(RaceFailure::AllCandidatesFailed {
                    tier: tier.name.clone(),
                    candidates: failed,
                });
            }
            Ok(Some(Ok((model, Ok(value))))) => {
                debug!(
                    tier = %tier.name,
                    model = %model,
                    abandoned = candidates.len(),
                    "Candidate won tier race"
                );
                record_candidate(&tier.name, "success");
                return Ok(value);
            }
            Ok(Some(Ok((model, Err(error))))) => {
                failed += 1;
                warn!(
                    tier = %tier.name,
                    model = %model,
                    error = %error,
                    "Candidate failed"
                );
                record_candidate(&tier.name, error.kind());
            }
            Ok(Some(Err(join_error))) => {
                failed += 1;
                warn!(
                    tier = %tier.name,
                    error = %join_error,
                    "Candidate task ended abnormally"
                );
                record_candidate(&tier.name, "aborted");
            }
        }
    }
}
