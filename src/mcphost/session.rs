//! The session capability contract and the transport factory.
//!
//! A [`ToolSession`] is a uniform handle over one backend server. The three
//! transport variants differ only in how they are constructed; after
//! [`open`] returns, the host treats every session through the same four
//! capabilities: `initialize`, `list_tools`, `call_tool`, `close`.
//!
//! Sessions are exclusively owned by the host and never shared, which is why
//! the trait methods take `&mut self` rather than relying on interior
//! mutability.

use crate::mcphost::server_def::{ServerDefinition, TransportKind};
use crate::mcphost::sessions::stateless_http::StatelessHttpSession;
use crate::mcphost::sessions::stdio::StdioSession;
use crate::mcphost::sessions::streaming_http::StreamingHttpSession;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::time::Duration;

/// Ceiling applied to every outbound session operation. Expiry surfaces as a
/// transport error so a stuck backend cannot hang a conversation turn.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type used at the session trait boundary.
pub type SessionError = Box<dyn Error + Send + Sync>;

/// One tool as advertised by a backend server, pre-namespacing.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteTool {
    /// Native tool name on the owning server.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Structural description of the tool's arguments; `None` when the server
    /// omits it (the catalog substitutes an empty object schema).
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Option<Value>,
}

/// Raw result of one tool invocation, before host normalization.
#[derive(Debug, Clone, Default)]
pub struct ToolOutcome {
    /// Ordered content parts exactly as the server returned them.
    pub content: Vec<Value>,
    /// Optional machine-readable payload (`structuredContent`).
    pub structured: Option<Value>,
}

impl ToolOutcome {
    /// Outcome holding a single text part. Convenient for in-process backends.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![serde_json::json!({"type": "text", "text": text.into()})],
            structured: None,
        }
    }

    /// Newline-joined concatenation, in order, of every text-bearing part.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Uniform capability surface over one backend server.
#[async_trait]
pub trait ToolSession: Send {
    /// Perform the transport's handshake. Idempotent; stateless transports
    /// use the default no-op.
    async fn initialize(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    /// Discover the tools this server advertises, in server order.
    async fn list_tools(&mut self) -> Result<Vec<RemoteTool>, SessionError>;

    /// Invoke one tool by its native name.
    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolOutcome, SessionError>;

    /// Release the transport. Must be safe to call on every exit path,
    /// including after a failed operation, and safe to call twice.
    async fn close(&mut self) -> Result<(), SessionError>;

    /// Transport identifier for events and diagnostics.
    fn transport_name(&self) -> &'static str;
}

/// Construct the session variant matching the definition's transport kind.
///
/// This is the only place in the crate that branches on [`TransportKind`];
/// everything downstream is polymorphic over [`ToolSession`].
pub fn open(def: &ServerDefinition) -> Result<Box<dyn ToolSession>, SessionError> {
    match def.transport {
        TransportKind::ProcessPipe => Ok(Box::new(StdioSession::spawn(def)?)),
        TransportKind::StreamingHttp => Ok(Box::new(StreamingHttpSession::new(def)?)),
        TransportKind::StatelessHttp => Ok(Box::new(StatelessHttpSession::new(def)?)),
    }
}

/// Build a reqwest header map from configured string pairs.
pub(crate) fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap, SessionError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        let name: HeaderName = key
            .parse()
            .map_err(|_| format!("invalid header name '{}'", key))?;
        let value: HeaderValue = value
            .parse()
            .map_err(|_| format!("invalid value for header '{}'", key))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Parse a `tools/list` result payload.
pub(crate) fn tools_from_result(result: Value) -> Result<Vec<RemoteTool>, SessionError> {
    let tools = result.get("tools").cloned().unwrap_or(Value::Array(Vec::new()));
    serde_json::from_value(tools).map_err(|err| format!("malformed tools/list result: {}", err).into())
}

/// Parse a `tools/call` result payload.
///
/// Accepts both the standard object shape (`content` + `structuredContent`)
/// and the shim shape where the result itself is a bare array of text blocks.
pub(crate) fn outcome_from_result(result: Value) -> ToolOutcome {
    match result {
        Value::Array(content) => ToolOutcome {
            content,
            structured: None,
        },
        Value::Object(mut fields) => {
            let content = match fields.remove("content") {
                Some(Value::Array(parts)) => parts,
                _ => Vec::new(),
            };
            let structured = fields
                .remove("structuredContent")
                .filter(|v| !v.is_null());
            ToolOutcome { content, structured }
        }
        _ => ToolOutcome::default(),
    }
}
