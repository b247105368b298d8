//! Anthropic Messages API client.
//!
//! Implements [`CompletionClient`] directly over HTTP. The Messages API is the
//! native home of the content-part protocol this crate speaks (`text`,
//! `tool_use`, `tool_result`), so requests and responses map onto
//! [`ContentBlock`] without translation.
//!
//! # Example
//!
//! ```rust,no_run
//! use mcphost::clients::anthropic::{AnthropicClient, Model};
//!
//! let client = AnthropicClient::new_with_model_enum(
//!     &std::env::var("ANTHROPIC_API_KEY").unwrap(),
//!     Model::ClaudeSonnet37,
//! );
//! ```

use crate::mcphost::completion::{CompletionClient, CompletionRequest, ContentBlock};
use async_trait::async_trait;
use log::error;
use serde_json::{json, Value};
use std::error::Error;
use std::time::Duration;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
/// Model used when `ANTHROPIC_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-latest";

const API_VERSION: &str = "2023-06-01";

/// Anthropic Claude models commonly used with this host.
pub enum Model {
    /// `claude-sonnet-4-5` – smartest model for complex agents and coding.
    ClaudeSonnet45,
    /// `claude-haiku-4-5` – fastest Sonnet 4.5 variant.
    ClaudeHaiku45,
    /// `claude-sonnet-4-0` – balanced reasoning + throughput.
    ClaudeSonnet4,
    /// `claude-3-7-sonnet-latest` – latest Sonnet 3.7 iteration.
    ClaudeSonnet37,
    /// `claude-3-5-haiku-latest` – fastest Claude tier.
    ClaudeHaiku35,
}

/// Convert a [`Model`] variant into its public string identifier.
fn model_to_string(model: Model) -> String {
    match model {
        Model::ClaudeSonnet45 => "claude-sonnet-4-5".to_string(),
        Model::ClaudeHaiku45 => "claude-haiku-4-5".to_string(),
        Model::ClaudeSonnet4 => "claude-sonnet-4-0".to_string(),
        Model::ClaudeSonnet37 => "claude-3-7-sonnet-latest".to_string(),
        Model::ClaudeHaiku35 => "claude-3-5-haiku-latest".to_string(),
    }
}

/// Client for the Anthropic Messages API.
pub struct AnthropicClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    /// Create a client from an API key and explicit model string.
    pub fn new_with_model_str(secret_key: &str, model_name: &str) -> Self {
        Self::new_with_base_url(secret_key, model_name, DEFAULT_BASE_URL)
    }

    /// Create a client from an API key and strongly typed model variant.
    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Self {
        Self::new_with_model_str(secret_key, &model_to_string(model))
    }

    /// Create a client pointing at a custom Claude-compatible base URL.
    pub fn new_with_base_url(secret_key: &str, model_name: &str, base_url: &str) -> Self {
        AnthropicClient {
            api_key: secret_key.to_string(),
            model: model_name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Build a client from `ANTHROPIC_API_KEY` / `ANTHROPIC_MODEL`.
    ///
    /// Returns `None` when no API key is configured; callers treat that as
    /// the offline mode.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var("ANTHROPIC_API_KEY").ok()?;
        if key.trim().is_empty() {
            return None;
        }
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Some(Self::new_with_model_str(&key, &model))
    }

    /// The configured model identifier.
    pub fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(
        &self,
        request: CompletionRequest<'_>,
    ) -> Result<Vec<ContentBlock>, Box<dyn Error + Send + Sync>> {
        let mut body = json!({
            "model": self.model,
            "system": request.system,
            "max_tokens": request.max_tokens,
            "messages": request.messages,
        });
        if let Some(tools) = request.tools {
            body["tools"] = Value::Array(tools.to_vec());
        }

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("AnthropicClient::complete error: {} {}", status, detail);
            return Err(format!("completion service returned status {}: {}", status, detail).into());
        }

        let payload: Value = response.json().await?;
        let raw_blocks = payload
            .get("content")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        // Parts outside the turn contract (e.g. thinking blocks) are dropped;
        // only text and tool_use participate in orchestration.
        let mut content = Vec::with_capacity(raw_blocks.len());
        for block in raw_blocks {
            if let Ok(block) = serde_json::from_value::<ContentBlock>(block) {
                content.push(block);
            }
        }
        Ok(content)
    }
}
