//! Backend invoker seam
//!
//! [`ModelInvoker`] is the transport contract the dispatcher races over. The
//! free functions here put the hard budget around a single call so that no
//! implementation has to get timeouts right on its own.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::time::timeout;

use super::error::InvokeError;
use crate::prompt::Prompt;
use crate::tiers::ModelId;

/// Incremental reply text from one streaming candidate
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, InvokeError>> + Send>>;

/// One remote call to one model.
///
/// Implementations perform exactly one attempt and never retry; fallback is
/// the racer's and escalator's job.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Buffered completion. Returns the full reply text.
    async fn complete(&self, model: &ModelId, prompt: &Prompt) -> Result<String, InvokeError>;

    /// Streaming completion. Returns once the upstream accepted the request.
    async fn open_stream(&self, model: &ModelId, prompt: &Prompt)
        -> Result<ChunkStream, InvokeError>;
}

/// Successful reply attributed to the model that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub model: ModelId,
}

/// A streaming candidate that produced its first content chunk
pub struct StreamStart {
    pub model: ModelId,
    pub first_chunk: String,
    pub rest: ChunkStream,
}

impl std::fmt::Debug for StreamStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamStart")
            .field("model", &self.model)
            .field("first_chunk", &self.first_chunk)
            .finish_non_exhaustive()
    }
}

/// Call `model` once, treating anything slower than `budget` as a timeout.
///
/// A blank reply counts as a malformed response. When the budget elapses the
/// in-flight call is dropped and its eventual result is never observed.
pub async fn invoke(
    invoker: &dyn ModelInvoker,
    model: &ModelId,
    prompt: &Prompt,
    budget: Duration,
) -> Result<Reply, InvokeError> {
    match timeout(budget, invoker.complete(model, prompt)).await {
        Ok(Ok(text)) if !text.trim().is_empty() => Ok(Reply {
            text,
            model: model.clone(),
        }),
        Ok(Ok(_)) => Err(InvokeError::MalformedResponse(
            "reply contained no text".to_string(),
        )),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(InvokeError::Timeout(budget)),
    }
}

/// Open a stream for `model` and wait for its first non-empty chunk.
///
/// The budget covers connecting plus the first piece of content; empty
/// keep-alive chunks before that do not count as success.
pub async fn first_chunk(
    invoker: &dyn ModelInvoker,
    model: &ModelId,
    prompt: &Prompt,
    budget: Duration,
) -> Result<StreamStart, InvokeError> {
    let attempt = async {
        let mut stream = invoker.open_stream(model, prompt).await?;
        loop {
            match stream.next().await {
                Some(Ok(chunk)) if !chunk.is_empty() => {
                    return Ok(StreamStart {
                        model: model.clone(),
                        first_chunk: chunk,
                        rest: stream,
                    })
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e),
                None => {
                    return Err(InvokeError::MalformedResponse(
                        "stream ended before any content".to_string(),
                    ))
                }
            }
        }
    };

    match timeout(budget, attempt).await {
        Ok(result) => result,
        Err(_) => Err(InvokeError::Timeout(budget)),
    }
}
