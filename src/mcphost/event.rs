//! Structured event log.
//!
//! The host and the conversation orchestrator emit one record per noteworthy
//! event to an [`EventSink`]. The log is append-only and write-only: nothing in
//! the crate ever reads records back, and a sink failure must never take a
//! conversation turn down, so write errors are logged and swallowed.
//!
//! The bundled [`JsonlEventSink`] writes one JSON object per line:
//!
//! ```json
//! {"ts":"2026-08-06T12:00:00Z","event":"call_tool.request","payload":{"server":"calc","tool":"add","args":{"a":2,"b":3}}}
//! ```

use chrono::Utc;
use log::warn;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// The closed set of event kinds written by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A session was opened and initialized.
    Connect,
    /// Tool discovery completed for one server.
    ListTools,
    /// A tool call is about to be forwarded to its owning session.
    CallToolRequest,
    /// A tool call returned; the payload is the normalized result.
    CallToolResponse,
    /// The completion service requested a tool execution.
    LlmToolUse,
    /// Final assistant text after a tool round-trip.
    LlmFinalResponse,
    /// Assistant text from a turn that used no tools.
    LlmDirectResponse,
}

impl EventKind {
    /// Stable string form used in serialized records.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connect => "connect",
            EventKind::ListTools => "list_tools",
            EventKind::CallToolRequest => "call_tool.request",
            EventKind::CallToolResponse => "call_tool.response",
            EventKind::LlmToolUse => "llm.tool_use",
            EventKind::LlmFinalResponse => "llm.final_response",
            EventKind::LlmDirectResponse => "llm.direct_response",
        }
    }
}

/// Consumer of structured event records.
///
/// Implementations must tolerate being called from any task; the default
/// sinks synchronize internally.
pub trait EventSink: Send + Sync {
    /// Append one record. Implementations must not propagate failures.
    fn write(&self, kind: EventKind, payload: Value);
}

/// Sink that discards every record. Used when no sink is configured.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn write(&self, _kind: EventKind, _payload: Value) {}
}

/// Append-only JSONL file sink.
pub struct JsonlEventSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlEventSink {
    /// Default log location, matching the host's conventional layout.
    pub const DEFAULT_PATH: &'static str = "logs/mcp_log.jsonl";

    /// Open (or create) the log file at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Open the sink at [`JsonlEventSink::DEFAULT_PATH`].
    pub fn open_default() -> std::io::Result<Self> {
        Self::open(Self::DEFAULT_PATH)
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for JsonlEventSink {
    fn write(&self, kind: EventKind, payload: Value) {
        let record = serde_json::json!({
            "ts": Utc::now().to_rfc3339(),
            "event": kind.as_str(),
            "payload": payload,
        });
        let mut line = record.to_string();
        line.push('\n');
        match self.file.lock() {
            Ok(mut file) => {
                if let Err(err) = file.write_all(line.as_bytes()) {
                    warn!("event log write failed for {:?}: {}", self.path, err);
                }
            }
            Err(_) => warn!("event log mutex poisoned; dropping {} record", kind.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kinds_have_stable_names() {
        assert_eq!(EventKind::Connect.as_str(), "connect");
        assert_eq!(EventKind::CallToolRequest.as_str(), "call_tool.request");
        assert_eq!(EventKind::CallToolResponse.as_str(), "call_tool.response");
        assert_eq!(EventKind::LlmDirectResponse.as_str(), "llm.direct_response");
    }
}
