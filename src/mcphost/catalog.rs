//! Namespaced tool catalog.
//!
//! Every tool discovered on a backend is exposed to the completion service
//! under `server__native`. The double underscore keeps names inside the
//! completion service's identifier grammar (dotted names are rejected) while
//! staying a pure, deterministic function of the two parts.

use crate::mcphost::error::HostError;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Separator between server name and native tool name.
pub const NAME_SEPARATOR: &str = "__";

/// Namespaced name for a tool: `server__native`.
pub fn namespaced_name(server: &str, native: &str) -> String {
    format!("{}{}{}", server, NAME_SEPARATOR, native)
}

/// The empty object schema substituted when a server omits `inputSchema`.
pub fn empty_object_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

/// One catalog entry: a tool with its namespaced identity and schema.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    /// Collision-free namespaced name (`server__native`).
    pub name: String,
    /// Owning server.
    pub server: String,
    /// Tool name on the owning server.
    pub native_name: String,
    /// Native description (possibly empty).
    pub description: String,
    /// Structural description of the tool's arguments.
    pub input_schema: Value,
}

/// Ordered collection of descriptors with a name index.
///
/// A catalog is always rebuilt wholesale: discovery assembles a complete new
/// instance off to the side and swaps it in, so a partially built catalog is
/// never observable.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    entries: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    /// Build a catalog from entries, rejecting duplicate namespaced names.
    pub fn from_entries(entries: Vec<ToolDescriptor>) -> Result<Self, HostError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if index.insert(entry.name.clone(), position).is_some() {
                return Err(HostError::Config(format!(
                    "duplicate namespaced tool name '{}'",
                    entry.name
                )));
            }
        }
        Ok(Self { entries, index })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in discovery order.
    pub fn entries(&self) -> &[ToolDescriptor] {
        &self.entries
    }

    /// Look up a descriptor by namespaced name.
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&position| &self.entries[position])
    }

    /// Every namespaced name, in catalog order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.name.clone()).collect()
    }

    /// Render the catalog as the tool definitions sent to the completion
    /// service: `{name, description: "[server] ...", input_schema}`.
    pub fn completion_tools(&self) -> Vec<Value> {
        self.entries
            .iter()
            .map(|entry| {
                json!({
                    "name": entry.name,
                    "description": format!("[{}] {}", entry.server, entry.description),
                    "input_schema": entry.input_schema,
                })
            })
            .collect()
    }
}
