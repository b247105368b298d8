//! # mcphost
//!
//! mcphost is a host process library that aggregates multiple independent
//! tool-providing backends (each reachable over a different transport) and
//! exposes their combined capabilities to an LLM completion service that can
//! request tool execution mid-conversation.
//!
//! The crate provides layered abstractions for:
//!
//! * **Sessions**: a uniform [`ToolSession`] capability surface over three
//!   transports (subprocess pipes, streaming HTTP, stateless HTTP), selected
//!   only at construction time
//! * **The Host**: [`Host`] owns the session set, discovers each server's
//!   tools, and publishes them under collision-free `server__tool` names in a
//!   single [`ToolCatalog`]
//! * **Dispatch**: namespaced lookup, argument-envelope adaptation, and
//!   normalization of tool results into `{server, tool, text, structured}`
//! * **Conversation orchestration**: [`ChatSession`] drives the two-round
//!   tool-calling protocol: first pass with the catalog, sequential tool
//!   execution, one combined `tool_result` message, then a tool-free second
//!   pass that produces the final reply
//! * **Observability**: every lifecycle step appends one structured record to
//!   an [`EventSink`]; the bundled [`JsonlEventSink`] writes JSONL
//!
//! ## Quickstart
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mcphost::{ChatSession, Host, HostConfig, JsonlEventSink};
//! use mcphost::clients::anthropic::AnthropicClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     mcphost::init_logger();
//!
//!     let config = HostConfig::from_json_str(
//!         r#"{"servers": [
//!             {"name": "calc", "transport": "process-pipe",
//!              "command": "python3", "args": ["calc_server.py"]}
//!         ]}"#,
//!     )?;
//!
//!     let sink = Arc::new(JsonlEventSink::open_default()?);
//!     let mut host = Host::new(config.servers).with_event_sink(sink.clone());
//!     host.connect().await?;
//!     host.discover_tools().await?;
//!
//!     let mut chat = ChatSession::new(host).with_event_sink(sink);
//!     if let Some(client) = AnthropicClient::from_env() {
//!         chat = chat.with_client(Arc::new(client));
//!     } // otherwise the session runs in offline echo mode
//!
//!     let reply = chat.ask("what is 2+3?").await?;
//!     println!("{}", reply);
//!
//!     chat.host_mut().disconnect_all().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Guarantees
//!
//! * Namespaced tool names are a pure function of `(server, native name)` and
//!   unique across the whole catalog; the catalog is rebuilt wholesale, never
//!   partially updated.
//! * Every `tool_use` the completion service emits is answered by exactly one
//!   `tool_result` with the matching id, in the same relative order, before
//!   the next completion-service call.
//! * Session teardown is symmetric and exception-tolerant: a failed connect
//!   releases everything that opened, and `disconnect_all` attempts every
//!   close before reporting an aggregate error.

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// The helper is intentionally lightweight so that applications embedding
/// mcphost can opt in to simple `RUST_LOG` driven diagnostics without having
/// to choose a specific logging backend upfront.
///
/// ```rust
/// mcphost::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `mcphost` module.
pub mod mcphost;

// Re-exporting key items for easier external access.
pub use crate::mcphost::catalog::{namespaced_name, ToolCatalog, ToolDescriptor, NAME_SEPARATOR};
pub use crate::mcphost::chat::ChatSession;
pub use crate::mcphost::clients;
pub use crate::mcphost::completion::{
    concat_text, ChatMessage, CompletionClient, CompletionRequest, ContentBlock, Role,
};
pub use crate::mcphost::error::HostError;
pub use crate::mcphost::event::{EventKind, EventSink, JsonlEventSink, NullEventSink};
pub use crate::mcphost::host::{DispatchOutcome, Host};
pub use crate::mcphost::server_def::{HostConfig, ServerDefinition, TransportKind};
pub use crate::mcphost::session::{RemoteTool, SessionError, ToolOutcome, ToolSession};
