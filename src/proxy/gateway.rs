//! Model gateway client
//!
//! Speaks the OpenAI-compatible `chat/completions` API of the shared model
//! gateway (OpenRouter by default) and implements [`ModelInvoker`] on top of
//! it. One instance serves every model; the model id travels in the body.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    config::Config,
    dispatch::{ChunkStream, InvokeError, ModelInvoker},
    prompt::{ChatMessage, Prompt},
    streaming::{parse_sse_line, SseFrame, SseLineBuffer},
    tiers::ModelId,
};

/// Request body sent to the gateway
#[derive(Debug, Serialize)]
struct GatewayRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

/// Buffered response body, reduced to the fields the relay reads
#[derive(Debug, Deserialize)]
struct GatewayResponse {
    #[serde(default)]
    choices: Vec<GatewayChoice>,
}

#[derive(Debug, Deserialize)]
struct GatewayChoice {
    message: GatewayMessage,
}

#[derive(Debug, Deserialize)]
struct GatewayMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Longest upstream error body kept in failure messages
const MAX_ERROR_BODY: usize = 300;

/// Model gateway client
pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

impl GatewayClient {
    /// Create a new gateway client.
    ///
    /// Fails when the configured API key cannot be used as a header value.
    pub fn new(client: reqwest::Client, config: &Config) -> Result<Self, InvalidApiKey> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.gateway_api_key))
                .map_err(|_| InvalidApiKey)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(title) = &config.gateway_app_title {
            if let Ok(value) = HeaderValue::from_str(title) {
                headers.insert("X-Title", value);
            }
        }

        Ok(Self {
            client,
            base_url: config.gateway_api_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// POST a chat request and return the response once its status is 2xx
    async fn post(
        &self,
        model: &ModelId,
        prompt: &Prompt,
        stream: bool,
    ) -> Result<reqwest::Response, InvokeError> {
        let params = prompt.params();
        let body = GatewayRequest {
            model: model.as_str(),
            messages: prompt.messages(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            stream,
        };

        let response = self
            .client
            .post(self.chat_url())
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| InvokeError::Transport(e.to_string()))?;

        let status = response.status();
        debug!(model = %model, status = %status, stream, "Gateway responded");

        if !status.is_success() {
            let mut text = response.text().await.unwrap_or_default();
            if text.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| text.is_char_boundary(*i))
                    .unwrap_or(0);
                text.truncate(cut);
            }
            return Err(InvokeError::Upstream {
                status: status.as_u16(),
                message: text,
            });
        }

        Ok(response)
    }
}

/// The gateway API key contains characters not allowed in a header
#[derive(Debug, thiserror::Error)]
#[error("GATEWAY_API_KEY is not a valid header value")]
pub struct InvalidApiKey;

#[async_trait]
impl ModelInvoker for GatewayClient {
    #[instrument(skip(self, prompt), fields(model = %model))]
    async fn complete(&self, model: &ModelId, prompt: &Prompt) -> Result<String, InvokeError> {
        let response = self.post(model, prompt, false).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| InvokeError::Transport(e.to_string()))?;

        let parsed: GatewayResponse = serde_json::from_slice(&body)
            .map_err(|e| InvokeError::MalformedResponse(format!("invalid JSON body: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| InvokeError::MalformedResponse("no reply content".to_string()))
    }

    #[instrument(skip(self, prompt), fields(model = %model))]
    async fn open_stream(
        &self,
        model: &ModelId,
        prompt: &Prompt,
    ) -> Result<ChunkStream, InvokeError> {
        let response = self.post(model, prompt, true).await?;
        let mut bytes = response.bytes_stream();

        let chunks = async_stream::stream! {
            let mut buffer = SseLineBuffer::new();
            while let Some(next) = bytes.next().await {
                let data = match next {
                    Ok(data) => data,
                    Err(e) => {
                        yield Err(InvokeError::Transport(e.to_string()));
                        return;
                    }
                };
                for line in buffer.feed(&data) {
                    match parse_sse_line(&line) {
                        SseFrame::Content(text) => yield Ok(text),
                        SseFrame::Done => return,
                        SseFrame::Error(message) => {
                            yield Err(InvokeError::MalformedResponse(format!(
                                "error event in stream: {}",
                                message
                            )));
                            return;
                        }
                        SseFrame::Skip => {}
                    }
                }
            }

            // Final frame without a trailing newline
            if buffer.has_incomplete() {
                match parse_sse_line(&buffer.remaining()) {
                    SseFrame::Content(text) => yield Ok(text),
                    SseFrame::Error(message) => {
                        yield Err(InvokeError::MalformedResponse(format!(
                            "error event in stream: {}",
                            message
                        )))
                    }
                    SseFrame::Done | SseFrame::Skip => {}
                }
            }
        };

        Ok(Box::pin(chunks))
    }
}
