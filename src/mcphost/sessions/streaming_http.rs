//! Streaming-HTTP transport: a stateful remote endpoint whose replies may be
//! framed as server-sent events.
//!
//! Every operation is a POST of one JSON-RPC request. The `initialize`
//! handshake captures the server's `mcp-session-id` header, which is replayed
//! on every later request; replies arrive either as a plain JSON body or as an
//! SSE stream whose `data:` events are scanned for the matching response id.

use crate::mcphost::jsonrpc::{self, method, Notification, Request, Response};
use crate::mcphost::server_def::ServerDefinition;
use crate::mcphost::session::{
    header_map, outcome_from_result, tools_from_result, RemoteTool, SessionError, ToolOutcome,
    ToolSession, CALL_TIMEOUT,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use log::debug;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};
use uuid::Uuid;

const SESSION_ID_HEADER: &str = "mcp-session-id";

/// Session over a persistent streaming-HTTP endpoint.
pub struct StreamingHttpSession {
    server: String,
    url: String,
    headers: HeaderMap,
    client: reqwest::Client,
    session_id: Option<String>,
    initialized: bool,
}

impl StreamingHttpSession {
    pub(crate) fn new(def: &ServerDefinition) -> Result<Self, SessionError> {
        let url = def
            .url
            .as_deref()
            .ok_or_else(|| format!("server '{}' has no 'url'", def.name))?;
        let client = reqwest::Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .map_err(|err| format!("failed to build HTTP client: {}", err))?;
        Ok(Self {
            server: def.name.clone(),
            url: url.to_string(),
            headers: header_map(&def.headers)?,
            client,
            session_id: None,
            initialized: false,
        })
    }

    fn post(&self) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .header(ACCEPT, "application/json, text/event-stream");
        if let Some(session_id) = &self.session_id {
            builder = builder.header(SESSION_ID_HEADER, session_id);
        }
        builder
    }

    /// POST one request and resolve its response from either body framing.
    async fn request(&mut self, method: &str, params: Value) -> Result<Value, SessionError> {
        let id = Uuid::new_v4().to_string();
        let response = self
            .post()
            .json(&Request::new(id.clone(), method, params))
            .send()
            .await
            .map_err(|err| format!("request to server '{}' failed: {}", self.server, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("server '{}' returned status {}", self.server, status).into());
        }
        if let Some(session_id) = response
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            self.session_id = Some(session_id.to_string());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        let envelope = if content_type.starts_with("text/event-stream") {
            self.read_sse_response(response, &id).await?
        } else {
            response
                .json::<Response>()
                .await
                .map_err(|err| format!("malformed response from '{}': {}", self.server, err))?
        };

        if let Some(err) = envelope.error {
            return Err(format!(
                "server '{}' returned error {}: {}",
                self.server, err.code, err.message
            )
            .into());
        }
        Ok(envelope.result.unwrap_or(Value::Null))
    }

    /// Scan SSE `data:` events for the response carrying our request id.
    async fn read_sse_response(
        &self,
        response: reqwest::Response,
        id: &str,
    ) -> Result<Response, SessionError> {
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|err| format!("stream from '{}' reset: {}", self.server, err))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim_end_matches('\r').to_string();
                buffer.drain(..=newline);
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let envelope: Response = match serde_json::from_str(data.trim()) {
                    Ok(envelope) => envelope,
                    Err(_) => {
                        debug!("server '{}': skipping non-JSON SSE event", self.server);
                        continue;
                    }
                };
                if envelope.id == Some(json!(id)) {
                    return Ok(envelope);
                }
            }
        }
        Err(format!(
            "event stream from '{}' ended without a response",
            self.server
        )
        .into())
    }

    async fn notify(&mut self, method: &str) -> Result<(), SessionError> {
        let response = self
            .post()
            .json(&Notification::new(method))
            .send()
            .await
            .map_err(|err| format!("notification to server '{}' failed: {}", self.server, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("server '{}' returned status {}", self.server, status).into());
        }
        Ok(())
    }
}

#[async_trait]
impl ToolSession for StreamingHttpSession {
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
        // Terminating the remote session is a DELETE with the session header.
        // Servers that never issued a session id have nothing to terminate.
        let Some(session_id) = self.session_id.take() else {
            return Ok(());
        };
        self.initialized = false;
        let response = self
            .client
            .delete(&self.url)
            .headers(self.headers.clone())
            .header(SESSION_ID_HEADER, &session_id)
            .send()
            .await
            .map_err(|err| format!("closing session on '{}' failed: {}", self.server, err))?;
        // A 405 just means the server does not support explicit termination.
        debug!(
            "server '{}': session terminate returned {}",
            self.server,
            response.status()
        );
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "streaming-http"
    }
}
