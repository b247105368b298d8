//! Server definitions: the configuration contract for tool backends.
//!
//! A [`ServerDefinition`] describes one backend: its unique name, which
//! transport reaches it, and the transport-specific parameters. Definitions
//! are immutable once loaded. The crate deliberately does not read config
//! files; an embedding application deserializes its own configuration into
//! [`HostConfig`] (any serde format works, [`HostConfig::from_json_str`] is
//! provided for the common JSON case).

use crate::mcphost::error::HostError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The three supported transports. Selected once at construction; the host
/// never branches on the kind after a session is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Subprocess speaking JSON-RPC over its stdin/stdout pipes.
    ProcessPipe,
    /// Persistent HTTP endpoint with a stateful session and SSE-framed replies.
    StreamingHttp,
    /// One independent HTTP request/response exchange per operation.
    StatelessHttp,
}

impl TransportKind {
    /// Stable string form, matching the serde wire names.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::ProcessPipe => "process-pipe",
            TransportKind::StreamingHttp => "streaming-http",
            TransportKind::StatelessHttp => "stateless-http",
        }
    }
}

/// One backend server: name, transport kind, and kind-specific parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerDefinition {
    /// Unique server name; becomes the namespace prefix of its tools.
    pub name: String,
    /// Transport used to reach the server.
    pub transport: TransportKind,
    /// Executable to spawn (process-pipe only).
    #[serde(default)]
    pub command: Option<String>,
    /// Arguments for the spawned executable (process-pipe only).
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables for the spawned executable (process-pipe only).
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Endpoint URL (HTTP kinds only).
    #[serde(default)]
    pub url: Option<String>,
    /// Extra request headers (HTTP kinds only).
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl ServerDefinition {
    /// Define a process-pipe server spawning `command`.
    pub fn process_pipe(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: TransportKind::ProcessPipe,
            command: Some(command.into()),
            args: Vec::new(),
            env: HashMap::new(),
            url: None,
            headers: HashMap::new(),
        }
    }

    /// Define a streaming-http server at `url`.
    pub fn streaming_http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: TransportKind::StreamingHttp,
            command: None,
            args: Vec::new(),
            env: HashMap::new(),
            url: Some(url.into()),
            headers: HashMap::new(),
        }
    }

    /// Define a stateless-http server at `url`.
    pub fn stateless_http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: TransportKind::StatelessHttp,
            command: None,
            args: Vec::new(),
            env: HashMap::new(),
            url: Some(url.into()),
            headers: HashMap::new(),
        }
    }

    /// Append a command-line argument (builder pattern).
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add an environment variable for the spawned process (builder pattern).
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Add an HTTP request header (builder pattern).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Check that every field the transport kind requires is present.
    ///
    /// Violations are fatal at connect time, before any session is opened.
    pub fn validate(&self) -> Result<(), HostError> {
        if self.name.trim().is_empty() {
            return Err(HostError::Config("server name must not be empty".to_string()));
        }
        match self.transport {
            TransportKind::ProcessPipe => {
                if self.command.as_deref().unwrap_or("").trim().is_empty() {
                    return Err(HostError::Config(format!(
                        "server '{}' uses transport '{}' but has no 'command'",
                        self.name,
                        self.transport.as_str()
                    )));
                }
            }
            TransportKind::StreamingHttp | TransportKind::StatelessHttp => {
                if self.url.as_deref().unwrap_or("").trim().is_empty() {
                    return Err(HostError::Config(format!(
                        "server '{}' uses transport '{}' but has no 'url'",
                        self.name,
                        self.transport.as_str()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// The full backend configuration: one definition per server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    /// Server definitions in connection order.
    pub servers: Vec<ServerDefinition>,
}

impl HostConfig {
    /// Parse a configuration from a JSON document the caller already loaded.
    pub fn from_json_str(json: &str) -> Result<Self, HostError> {
        serde_json::from_str(json)
            .map_err(|err| HostError::Config(format!("invalid server configuration: {}", err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_definition_without_url_fails_validation() {
        let mut def = ServerDefinition::streaming_http("movies", "http://localhost:9000/mcp");
        def.url = None;
        let err = def.validate().unwrap_err();
        assert!(matches!(err, HostError::Config(_)));
        assert!(err.to_string().contains("movies"));
    }

    #[test]
    fn process_pipe_requires_command() {
        let mut def = ServerDefinition::process_pipe("calc", "python3");
        assert!(def.validate().is_ok());
        def.command = Some("  ".to_string());
        assert!(def.validate().is_err());
    }

    #[test]
    fn config_parses_kebab_case_transports() {
        let config = HostConfig::from_json_str(
            r#"{
                "servers": [
                    {"name": "calc", "transport": "process-pipe", "command": "python3", "args": ["calc_server.py"]},
                    {"name": "movies", "transport": "streaming-http", "url": "http://localhost:9000/mcp-stream"},
                    {"name": "shim", "transport": "stateless-http", "url": "http://localhost:9000/mcp", "headers": {"x-api-key": "k"}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.servers.len(), 3);
        assert_eq!(config.servers[0].transport, TransportKind::ProcessPipe);
        assert_eq!(config.servers[1].transport, TransportKind::StreamingHttp);
        assert_eq!(config.servers[2].transport, TransportKind::StatelessHttp);
        assert_eq!(config.servers[2].headers.get("x-api-key").unwrap(), "k");
    }
}
