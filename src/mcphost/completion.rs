//! The completion-service contract.
//!
//! A completion service is the conversational-agent backend: it receives the
//! system prompt, the ordered conversation, and (on the first round of a turn)
//! the tool catalog, and replies with ordered content parts that are either
//! text or tool-use requests. The crate talks to it through the
//! [`CompletionClient`] trait; `clients::anthropic` provides the bundled
//! implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;

/// Roles a conversation message can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One ordered content part of a conversation message.
///
/// Serialized exactly as the wire shape the completion service uses, so a
/// message can be appended to the conversation and resent verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain assistant or user text.
    Text { text: String },
    /// A tool execution requested by the completion service.
    ToolUse { id: String, name: String, input: Value },
    /// The answer to one tool_use, correlated by id.
    ToolResult { tool_use_id: String, content: String },
}

impl ContentBlock {
    /// Build a text part.
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

/// One message of the conversation: a role plus ordered content parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl ChatMessage {
    /// A user message holding a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// An assistant message with the given parts.
    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }
}

/// Concatenate every text part of a response, in order.
pub fn concat_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// One atomic request to the completion service.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    /// System prompt steering the model.
    pub system: &'a str,
    /// Full ordered conversation.
    pub messages: &'a [ChatMessage],
    /// Tool catalog entries; `None` on the tool-free second round.
    pub tools: Option<&'a [Value]>,
    /// Output token budget for this call.
    pub max_tokens: u32,
}

/// Interface to a conversational completion service.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one request and return the response's ordered content parts.
    async fn complete(
        &self,
        request: CompletionRequest<'_>,
    ) -> Result<Vec<ContentBlock>, Box<dyn Error + Send + Sync>>;
}
