//! Error types for host and conversation operations.
//!
//! The crate exposes a single domain error enum, [`HostError`]. Transport and
//! session implementations report failures as `Box<dyn Error + Send + Sync>`
//! at the trait boundary; the [`Host`](crate::mcphost::host::Host) maps those
//! into the matching `HostError` variant before they reach callers.

use std::error::Error;
use std::fmt;

/// Domain errors surfaced by the host and the conversation orchestrator.
#[derive(Debug)]
pub enum HostError {
    /// A server definition is missing a field its transport kind requires,
    /// or the host was asked to do something its lifecycle forbids.
    /// Fatal at connect time, before any session is opened.
    Config(String),
    /// A transport-level failure on one server: spawn error, non-success HTTP
    /// status, broken stream, or an operation that hit the timeout ceiling.
    Transport {
        /// Server whose session failed.
        server: String,
        /// Underlying failure description.
        message: String,
    },
    /// A dispatch request named a tool that is not in the current catalog.
    /// No session is contacted; `known` enumerates every registered name.
    Dispatch {
        /// The namespaced name that failed to resolve.
        name: String,
        /// All currently known namespaced tool names.
        known: Vec<String>,
    },
    /// The underlying tool call failed or timed out after dispatch resolved.
    ToolExecution {
        /// Owning server.
        server: String,
        /// Native tool name.
        tool: String,
        /// Underlying failure description.
        message: String,
    },
    /// The completion service rejected or failed a request.
    Completion(String),
    /// One or more sessions failed to close during teardown. Every close was
    /// still attempted; the session set is empty when this is returned.
    Teardown(Vec<(String, String)>),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Config(msg) => write!(f, "configuration error: {}", msg),
            HostError::Transport { server, message } => {
                write!(f, "transport error on server '{}': {}", server, message)
            }
            HostError::Dispatch { name, known } => {
                write!(
                    f,
                    "tool '{}' is not registered. Known tools: [{}]",
                    name,
                    known.join(", ")
                )
            }
            HostError::ToolExecution {
                server,
                tool,
                message,
            } => {
                write!(f, "tool '{}' on server '{}' failed: {}", tool, server, message)
            }
            HostError::Completion(msg) => write!(f, "completion service error: {}", msg),
            HostError::Teardown(failures) => {
                write!(f, "teardown failed for {} session(s): ", failures.len())?;
                for (idx, (server, message)) in failures.iter().enumerate() {
                    if idx > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "'{}': {}", server, message)?;
                }
                Ok(())
            }
        }
    }
}

impl Error for HostError {}
