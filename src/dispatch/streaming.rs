//! Streaming dispatch
//!
//! Same tier walk as [`Dispatcher::dispatch`], but a candidate wins as soon as
//! it emits its first piece of content. From then on the dispatch is committed
//! to that candidate: its remaining chunks are forwarded in order and the
//! sequence closes with [`StreamEvent::Done`], even if the winner drops
//! mid-stream. Already-delivered text is never followed by a failure marker.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn, Instrument, Span};

use super::error::BUSY_MESSAGE;
use super::escalator::{effective_budget, DispatchState, Dispatcher};
use super::race;
use crate::prompt::Prompt;
use crate::routes::metrics::record_escalation;
use crate::tiers::ModelId;

/// One event of a streamed dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Progress note, emitted when a tier race starts
    Status { tier: String, message: String },
    /// Reply text from the winning model
    Delta { content: String },
    /// Closes a successful stream
    Done {
        #[serde(rename = "modelUsed")]
        model_used: ModelId,
    },
    /// Closes a stream in which no tier produced content
    Failed,
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Failed)
    }
}

/// Lazy event sequence of a streamed dispatch
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

impl Dispatcher {
    /// Dispatch a prompt, streaming the winner's reply as it arrives.
    ///
    /// Nothing runs until the returned stream is polled. Dropping the stream
    /// cancels whatever race or upstream read is in progress.
    pub fn dispatch_streaming(&self, prompt: Prompt, span: Span) -> EventStream {
        let this = self.clone();

        Box::pin(async_stream::stream! {
            let deadline = Instant::now() + this.ceiling;
            let tiers = this.tiers.tiers();
            let mut state = DispatchState::Pending.next(tiers.len(), false);
            let mut winner = None;

            while let DispatchState::Racing(index) = state {
                let tier = &tiers[index];
                let Some(budget) = effective_budget(tier.budget, deadline) else {
                    warn!(parent: &span, tier = %tier.name, "Dispatch ceiling spent, skipping remaining tiers");
                    state = DispatchState::Exhausted;
                    break;
                };

                yield StreamEvent::Status {
                    tier: tier.name.clone(),
                    message: format!("Racing {} {} models", tier.models.len(), tier.name),
                };

                match race::race_first_chunk(&this.invoker, tier, &prompt, budget)
                    .instrument(span.clone())
                    .await
                {
                    Ok(start) => {
                        info!(parent: &span, tier = %tier.name, model = %start.model, "Tier produced first chunk");
                        state = state.next(tiers.len(), true);
                        winner = Some(start);
                    }
                    Err(failure) => {
                        state = state.next(tiers.len(), false);
                        warn!(parent: &span, tier = %tier.name, reason = %failure, "Tier produced no content");
                        if matches!(state, DispatchState::Racing(_)) {
                            record_escalation(&tier.name, failure.kind());
                        }
                    }
                }
            }

            match winner {
                Some(start) => {
                    let model = start.model;
                    let mut rest = start.rest;
                    let mut chunks = 1usize;
                    yield StreamEvent::Delta { content: start.first_chunk };

                    loop {
                        match timeout_at(deadline, rest.next()).await {
                            Ok(Some(Ok(content))) => {
                                if !content.is_empty() {
                                    chunks += 1;
                                    yield StreamEvent::Delta { content };
                                }
                            }
                            Ok(Some(Err(e))) => {
                                warn!(parent: &span, model = %model, chunks, error = %e, "Winner failed mid-stream, keeping partial output");
                                break;
                            }
                            Ok(None) => break,
                            Err(_) => {
                                warn!(parent: &span, model = %model, chunks, "Dispatch ceiling reached mid-stream, closing");
                                break;
                            }
                        }
                    }

                    info!(parent: &span, model = %model, chunks, "Stream completed");
                    yield StreamEvent::Done { model_used: model };
                }
                None => {
                    error!(parent: &span, state = ?state, "All tiers exhausted before any content");
                    yield StreamEvent::Delta { content: BUSY_MESSAGE.to_string() };
                    yield StreamEvent::Failed;
                }
            }
        })
    }
}
