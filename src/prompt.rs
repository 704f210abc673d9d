//! Conversation and prompt types
//!
//! A [`Prompt`] is the caller's conversation with the enrichment preamble
//! already prepended. It is built once per request and shared read-only by
//! every candidate of every tier.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Chat message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Optional sampling parameters forwarded with every candidate call
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CallParams {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// Immutable prompt shared across all candidates of a dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    messages: Arc<[ChatMessage]>,
    params: CallParams,
}

impl Prompt {
    /// Build a prompt from a preamble and the caller's conversation.
    ///
    /// Returns `None` when the conversation is empty.
    pub fn build(
        preamble: impl Into<String>,
        conversation: Vec<ChatMessage>,
        params: CallParams,
    ) -> Option<Self> {
        if conversation.is_empty() {
            return None;
        }

        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(ChatMessage::system(preamble));
        messages.extend(conversation);

        Some(Self {
            messages: messages.into(),
            params,
        })
    }

    /// Wrap an already-assembled message list without adding a preamble.
    pub fn from_messages(messages: Vec<ChatMessage>, params: CallParams) -> Option<Self> {
        if messages.is_empty() {
            return None;
        }
        Some(Self {
            messages: messages.into(),
            params,
        })
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn params(&self) -> CallParams {
        self.params
    }
}

/// System preamble injected ahead of the conversation
pub fn preamble(assistant_name: &str, context: &str) -> String {
    format!("You are {}. Use this context: {}", assistant_name, context)
}

/// Text of the last message in a conversation, used as the search query
pub fn last_message_text(conversation: &[ChatMessage]) -> Option<&str> {
    conversation
        .last()
        .map(|m| m.content.trim())
        .filter(|s| !s.is_empty())
}
