//! Process-pipe transport: a spawned subprocess speaking newline-delimited
//! JSON-RPC over its standard input/output streams.

use crate::mcphost::jsonrpc::{self, method, Notification, Request, Response};
use crate::mcphost::server_def::ServerDefinition;
use crate::mcphost::session::{
    outcome_from_result, tools_from_result, RemoteTool, SessionError, ToolOutcome, ToolSession,
    CALL_TIMEOUT,
};
use async_trait::async_trait;
use log::debug;
use serde_json::{json, Value};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;

/// Session over a spawned subprocess.
///
/// The child's stderr is discarded; its stdout is reserved for the protocol.
/// `kill_on_drop` guarantees the process cannot outlive a session that was
/// dropped without an explicit [`close`](ToolSession::close).
pub struct StdioSession {
    server: String,
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    initialized: bool,
}

impl StdioSession {
    /// Spawn the configured command and wire up its pipes.
    pub(crate) fn spawn(def: &ServerDefinition) -> Result<Self, SessionError> {
        let command = def
            .command
            .as_deref()
            .ok_or_else(|| format!("server '{}' has no 'command'", def.name))?;
        let mut child = Command::new(command)
            .args(&def.args)
            .envs(&def.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| format!("failed to spawn '{}': {}", command, err))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| format!("no stdin pipe for '{}'", command))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| format!("no stdout pipe for '{}'", command))?;
        Ok(Self {
            server: def.name.clone(),
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
            initialized: false,
        })
    }

    /// Send one request and read lines until the matching response id arrives.
    ///
    /// Server-initiated notifications and requests interleaved on stdout are
    /// skipped; only a response carrying our id terminates the wait.
    async fn request(&mut self, method: &str, params: Value) -> Result<Value, SessionError> {
        self.next_id += 1;
        let id = self.next_id;
        let mut line = serde_json::to_string(&Request::new(id, method, params))?;
        line.push('\n');

        let stdin = &mut self.stdin;
        let stdout = &mut self.stdout;
        let server = self.server.as_str();
        let exchange = async move {
            stdin.write_all(line.as_bytes()).await?;
            stdin.flush().await?;
            loop {
                let raw = match stdout.next_line().await? {
                    Some(raw) => raw,
                    None => {
                        return Err::<Value, SessionError>(
                            format!("server '{}' closed its stdout", server).into(),
                        )
                    }
                };
                if raw.trim().is_empty() {
                    continue;
                }
                let response: Response = match serde_json::from_str(&raw) {
                    Ok(response) => response,
                    Err(_) => {
                        debug!("server '{}': skipping non-JSON-RPC line", server);
                        continue;
                    }
                };
                if response.id != Some(json!(id)) {
                    continue;
                }
                if let Some(err) = response.error {
                    return Err(format!(
                        "server '{}' returned error {}: {}",
                        server, err.code, err.message
                    )
                    .into());
                }
                return Ok(response.result.unwrap_or(Value::Null));
            }
        };

        timeout(CALL_TIMEOUT, exchange)
            .await
            .map_err(|_| -> SessionError {
                format!(
                    "'{}' call to server '{}' timed out after {:?}",
                    method, self.server, CALL_TIMEOUT
                )
                .into()
            })?
    }

    /// Send one notification (no reply is read).
    async fn notify(&mut self, method: &str) -> Result<(), SessionError> {
        let mut line = serde_json::to_string(&Notification::new(method))?;
        line.push('\n');
        timeout(CALL_TIMEOUT, async {
            self.stdin.write_all(line.as_bytes()).await?;
            self.stdin.flush().await
        })
        .await
        .map_err(|_| -> SessionError {
            format!("notification to server '{}' timed out", self.server).into()
        })??;
        Ok(())
    }
}

#[async_trait]
impl ToolSession for StdioSession {
    async fn initialize(&mut self) -> Result<(), SessionError> {
        if self.initialized {
            return Ok(());
        }
        self.request(method::INITIALIZE, jsonrpc::initialize_params())
            .await?;
        self.notify(method::INITIALIZED).await?;
        self.initialized = true;
        Ok(())
    }

    async fn list_tools(&mut self) -> Result<Vec<RemoteTool>, SessionError> {
        let result = self.request(method::TOOLS_LIST, json!({})).await?;
        tools_from_result(result)
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolOutcome, SessionError> {
        let result = self
            .request(method::TOOLS_CALL, jsonrpc::call_tool_params(name, arguments))
            .await?;
        Ok(outcome_from_result(result))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        // Closing stdin is the polite shutdown signal; the kill below covers
        // servers that ignore it.
        let _ = self.stdin.shutdown().await;
        if let Err(err) = self.child.start_kill() {
            // InvalidInput means the child already exited.
            if err.kind() != std::io::ErrorKind::InvalidInput {
                return Err(format!("failed to kill server '{}': {}", self.server, err).into());
            }
        }
        timeout(CALL_TIMEOUT, self.child.wait())
            .await
            .map_err(|_| -> SessionError {
                format!("server '{}' did not exit after kill", self.server).into()
            })?
            .map_err(|err| -> SessionError {
                format!("wait for server '{}' failed: {}", self.server, err).into()
            })?;
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "process-pipe"
    }
}
