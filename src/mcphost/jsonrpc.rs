//! JSON-RPC 2.0 envelopes and MCP method parameters.
//!
//! All three transports speak the same JSON-RPC framing; only the carrier
//! differs. This module holds the typed envelopes and the parameter builders
//! for the handful of MCP methods the host uses.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Protocol version announced during the `initialize` handshake.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Method names used by the host.
pub mod method {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
}

/// Outbound request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    jsonrpc: &'static str,
    pub id: Value,
    pub method: String,
    pub params: Value,
}

impl Request {
    /// Build a request with the given correlation id.
    pub fn new(id: impl Into<Value>, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: id.into(),
            method: method.to_string(),
            params,
        }
    }
}

/// Outbound notification envelope (no id, no reply expected).
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
}

impl Notification {
    /// Build a notification for `method`.
    pub fn new(method: &str) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.to_string(),
            params: json!({}),
        }
    }
}

/// Inbound response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Correlation id; absent on server-initiated notifications.
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

/// Error object from a failed JSON-RPC call.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Parameters for the `initialize` handshake.
pub fn initialize_params() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

/// Parameters for a `tools/call` invocation.
pub fn call_tool_params(name: &str, arguments: Value) -> Value {
    json!({
        "name": name,
        "arguments": arguments,
    })
}
