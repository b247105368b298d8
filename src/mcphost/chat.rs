//! Conversation orchestration: the two-round tool-calling protocol.
//!
//! A [`ChatSession`] owns one [`Host`] and the append-only conversation state,
//! and drives each turn through the state machine:
//!
//! ```text
//! Idle ──▶ FirstPass ──▶ DirectAnswer ──▶ Idle          (no tool requests)
//!               │
//!               └──▶ ToolExecution ──▶ SecondPass ──▶ Finalize ──▶ Idle
//! ```
//!
//! The first round carries the full tool catalog; if the completion service
//! requests tools they execute strictly sequentially in response order, each
//! answered by exactly one `tool_result` correlated by id. All results travel
//! back in a single user-role message, and the second round runs without the
//! catalog. When no completion credential is configured every turn
//! short-circuits into a literal echo reply.

use crate::mcphost::completion::{
    concat_text, ChatMessage, CompletionClient, CompletionRequest, ContentBlock, Role,
};
use crate::mcphost::error::HostError;
use crate::mcphost::event::{EventKind, EventSink, NullEventSink};
use crate::mcphost::host::Host;
use log::warn;
use serde_json::json;
use std::sync::Arc;

/// Output token budget for the tool-selection round.
pub const FIRST_PASS_MAX_TOKENS: u32 = 600;
/// Output token budget for the tool-free second round.
pub const SECOND_PASS_MAX_TOKENS: u32 = 800;

/// System prompt used when the embedder does not provide one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer in natural language.\n\
     When the user's request matches one of the available tools, use it.\n\
     Only use the parameters listed in the tool's schema.\n";

/// A conversation bound to one host and (optionally) one completion service.
pub struct ChatSession {
    host: Host,
    client: Option<Arc<dyn CompletionClient>>,
    system_prompt: String,
    messages: Vec<ChatMessage>,
    sink: Arc<dyn EventSink>,
}

impl ChatSession {
    /// Create a session over `host`. Without a client the session runs in
    /// offline echo mode.
    pub fn new(host: Host) -> Self {
        Self {
            host,
            client: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            messages: Vec::new(),
            sink: Arc::new(NullEventSink),
        }
    }

    /// Attach a completion-service client (builder pattern).
    pub fn with_client(mut self, client: Arc<dyn CompletionClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Attach a structured event sink (builder pattern).
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Override the default system prompt (builder pattern).
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Replace the system prompt at runtime.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    /// Borrow the owned host.
    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Mutably borrow the owned host (connect, discover, disconnect).
    pub fn host_mut(&mut self) -> &mut Host {
        &mut self.host
    }

    /// Number of messages accumulated in the conversation.
    pub fn history_len(&self) -> usize {
        self.messages.len()
    }

    /// Reset the conversation to the empty sequence. Nothing else changes;
    /// the next turn starts with no prior context.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Run one full turn: user text in, finalized assistant reply out.
    pub async fn ask(&mut self, user_text: &str) -> Result<String, HostError> {
        self.messages.push(ChatMessage::user_text(user_text));

        let Some(client) = self.client.clone() else {
            let reply = format!("(offline) received: {}", user_text);
            self.messages
                .push(ChatMessage::assistant(vec![ContentBlock::text(reply.clone())]));
            return Ok(reply);
        };

        // FirstPass: full conversation plus the full tool catalog.
        let tools = self.host.catalog().completion_tools();
        let first = client
            .complete(CompletionRequest {
                system: &self.system_prompt,
                messages: &self.messages,
                tools: Some(&tools),
                max_tokens: FIRST_PASS_MAX_TOKENS,
            })
            .await
            .map_err(|err| HostError::Completion(err.to_string()))?;
        self.messages.push(ChatMessage::assistant(first.clone()));

        let tool_uses: Vec<(String, String, serde_json::Value)> = first
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => {
                    Some((id.clone(), name.clone(), input.clone()))
                }
                _ => None,
            })
            .collect();

        if tool_uses.is_empty() {
            // DirectAnswer: no second round.
            let direct = concat_text(&first);
            self.sink
                .write(EventKind::LlmDirectResponse, json!({"text": direct}));
            return Ok(direct);
        }

        // ToolExecution: strictly sequential, in the order the completion
        // service returned them. Later calls may depend on earlier ones and
        // the event log must preserve causal order.
        let mut confirmations = Vec::with_capacity(tool_uses.len());
        let mut tool_results = Vec::with_capacity(tool_uses.len());
        for (id, name, input) in tool_uses {
            self.sink
                .write(EventKind::LlmToolUse, json!({"name": name, "args": input}));
            let content = match self.host.dispatch(&name, input).await {
                Ok(outcome) => {
                    confirmations.push(format!(
                        "**✅ Tool executed**\n- server: `{}`\n- tool: `{}`",
                        outcome.server, outcome.tool
                    ));
                    serde_json::to_string(&outcome).unwrap_or_else(|_| "{}".to_string())
                }
                Err(err) => {
                    // A failing tool is folded into an error tool_result so
                    // the model can react in the second pass; one bad call
                    // must not abort the turn.
                    warn!("tool call '{}' failed: {}", name, err);
                    confirmations.push(format!(
                        "**⚠️ Tool failed**\n- tool: `{}`\n- error: {}",
                        name, err
                    ));
                    json!({"error": err.to_string()}).to_string()
                }
            };
            tool_results.push(ContentBlock::ToolResult {
                tool_use_id: id,
                content,
            });
        }

        // SecondPass: the ordered tool results travel in ONE user message,
        // and the catalog is omitted this time.
        self.messages.push(ChatMessage {
            role: Role::User,
            content: tool_results,
        });
        let second = client
            .complete(CompletionRequest {
                system: &self.system_prompt,
                messages: &self.messages,
                tools: None,
                max_tokens: SECOND_PASS_MAX_TOKENS,
            })
            .await
            .map_err(|err| HostError::Completion(err.to_string()))?;
        let final_text = concat_text(&second);
        self.messages.push(ChatMessage::assistant(second));
        self.sink
            .write(EventKind::LlmFinalResponse, json!({"text": final_text}));

        // Finalize: confirmations in invocation order, then the model's text.
        let mut parts = confirmations;
        parts.push(final_text);
        Ok(parts.join("\n\n"))
    }
}
