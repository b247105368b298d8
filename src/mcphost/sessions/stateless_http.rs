//! Stateless single-request HTTP transport.
//!
//! Each `list_tools`/`call_tool` is one independent POST carrying a JSON-RPC
//! envelope; there is no handshake and no session state on the server. Some
//! stateless shims return the `tools/call` result as a bare array of text
//! blocks rather than the standard object shape; both are accepted.

use crate::mcphost::jsonrpc::{self, method, Request, Response};
use crate::mcphost::server_def::ServerDefinition;
use crate::mcphost::session::{
    header_map, outcome_from_result, tools_from_result, RemoteTool, SessionError, ToolOutcome,
    ToolSession, CALL_TIMEOUT,
};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::{json, Value};

/// Session over a stateless HTTP endpoint.
pub struct StatelessHttpSession {
    server: String,
    url: String,
    headers: HeaderMap,
    client: reqwest::Client,
}

impl StatelessHttpSession {
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
            url: url.trim_end_matches('/').to_string(),
            headers: header_map(&def.headers)?,
            client,
        })
    }

    async fn request(&self, id: &str, method: &str, params: Value) -> Result<Value, SessionError> {
        let response = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .json(&Request::new(id, method, params))
            .send()
            .await
            .map_err(|err| format!("request to server '{}' failed: {}", self.server, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("server '{}' returned status {}", self.server, status).into());
        }
        let envelope: Response = response
            .json()
            .await
            .map_err(|err| format!("malformed response from '{}': {}", self.server, err))?;
        if let Some(err) = envelope.error {
            return Err(format!(
                "server '{}' returned error {}: {}",
                self.server, err.code, err.message
            )
            .into());
        }
        Ok(envelope.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl ToolSession for StatelessHttpSession {
    // initialize: default no-op; a stateless exchange has nothing to handshake.

    async fn list_tools(&mut self) -> Result<Vec<RemoteTool>, SessionError> {
        let result = self.request("list", method::TOOLS_LIST, json!({})).await?;
        tools_from_result(result)
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolOutcome, SessionError> {
        let result = self
            .request("call", method::TOOLS_CALL, jsonrpc::call_tool_params(name, arguments))
            .await?;
        Ok(outcome_from_result(result))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "stateless-http"
    }
}
