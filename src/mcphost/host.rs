//! The host: session lifecycle, tool discovery, and dispatch.
//!
//! A [`Host`] owns one session per configured backend for the lifetime of the
//! process, aggregates their tools into a single namespaced
//! [`ToolCatalog`](crate::mcphost::catalog::ToolCatalog), routes tool calls to
//! the owning session, and emits a structured event per lifecycle step.
//!
//! All mutating operations take `&mut self`; the borrow checker therefore
//! serializes `connect`, `discover_tools`, `dispatch`, and `disconnect_all`
//! on one instance. Independent hosts share no state.

use crate::mcphost::catalog::{empty_object_schema, namespaced_name, ToolCatalog, ToolDescriptor};
use crate::mcphost::error::HostError;
use crate::mcphost::event::{EventKind, EventSink, NullEventSink};
use crate::mcphost::server_def::ServerDefinition;
use crate::mcphost::session::{self, ToolSession};
use log::warn;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Normalized result of one dispatched tool call.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    /// Owning server.
    pub server: String,
    /// Native tool name.
    pub tool: String,
    /// Newline-joined concatenation of every text-bearing content part.
    pub text: String,
    /// Optional machine-readable payload from the server.
    pub structured: Option<Value>,
}

struct SessionHandle {
    server: String,
    session: Box<dyn ToolSession>,
}

/// Aggregates heterogeneous transport sessions behind one tool surface.
pub struct Host {
    defs: Vec<ServerDefinition>,
    sessions: Vec<SessionHandle>,
    catalog: ToolCatalog,
    sink: Arc<dyn EventSink>,
}

impl Host {
    /// Create a host over the given definitions. No session is opened yet.
    pub fn new(defs: Vec<ServerDefinition>) -> Self {
        Self {
            defs,
            sessions: Vec::new(),
            catalog: ToolCatalog::default(),
            sink: Arc::new(NullEventSink),
        }
    }

    /// Attach a structured event sink (builder pattern).
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Whether at least one session is currently open.
    pub fn is_connected(&self) -> bool {
        !self.sessions.is_empty()
    }

    /// Names of the currently open sessions, in connection order.
    pub fn server_names(&self) -> Vec<&str> {
        self.sessions.iter().map(|handle| handle.server.as_str()).collect()
    }

    /// The current tool catalog.
    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Attach an already constructed session under `server`.
    ///
    /// Lets embedders plug in in-process backends next to the configured
    /// transports; tests use it to inject scripted sessions. The session
    /// becomes part of the host's teardown set like any other.
    pub fn attach_session(&mut self, server: impl Into<String>, session: Box<dyn ToolSession>) {
        let server = server.into();
        self.sink.write(
            EventKind::Connect,
            json!({"server": server, "transport": session.transport_name()}),
        );
        self.sessions.push(SessionHandle { server, session });
    }

    /// Open and initialize one session per configured definition.
    ///
    /// Every definition is validated before the first session opens, so a
    /// configuration error can never leave a partial set behind. If opening
    /// or initializing any session fails, every session that did open is
    /// released before the error is returned.
    pub async fn connect(&mut self) -> Result<(), HostError> {
        if self.is_connected() {
            return Err(HostError::Config(
                "host is already connected; call disconnect_all first".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for def in &self.defs {
            def.validate()?;
            if !seen.insert(def.name.clone()) {
                return Err(HostError::Config(format!(
                    "duplicate server name '{}'",
                    def.name
                )));
            }
        }

        let mut opened: Vec<SessionHandle> = Vec::with_capacity(self.defs.len());
        for def in &self.defs {
            let result = match session::open(def) {
                Ok(mut session) => session
                    .initialize()
                    .await
                    .map(|_| session)
                    .map_err(|err| HostError::Transport {
                        server: def.name.clone(),
                        message: err.to_string(),
                    }),
                Err(err) => Err(HostError::Transport {
                    server: def.name.clone(),
                    message: err.to_string(),
                }),
            };
            match result {
                Ok(session) => {
                    self.sink.write(
                        EventKind::Connect,
                        json!({"server": def.name, "transport": def.transport.as_str()}),
                    );
                    opened.push(SessionHandle {
                        server: def.name.clone(),
                        session,
                    });
                }
                Err(err) => {
                    // Symmetric teardown: release everything that did open.
                    for mut handle in opened {
                        if let Err(close_err) = handle.session.close().await {
                            warn!(
                                "closing '{}' during connect rollback failed: {}",
                                handle.server, close_err
                            );
                        }
                    }
                    return Err(err);
                }
            }
        }
        self.sessions = opened;
        Ok(())
    }

    /// Rebuild the tool catalog from every open session.
    ///
    /// The new catalog and its name index are assembled completely before
    /// replacing the old ones; a failed discovery leaves the previous catalog
    /// in place.
    pub async fn discover_tools(&mut self) -> Result<(), HostError> {
        let sink = Arc::clone(&self.sink);
        let mut entries = Vec::new();
        for handle in &mut self.sessions {
            let tools = handle
                .session
                .list_tools()
                .await
                .map_err(|err| HostError::Transport {
                    server: handle.server.clone(),
                    message: err.to_string(),
                })?;
            sink.write(
                EventKind::ListTools,
                json!({
                    "server": handle.server,
                    "tools": tools.iter().map(|tool| tool.name.clone()).collect::<Vec<_>>(),
                }),
            );
            for tool in tools {
                entries.push(ToolDescriptor {
                    name: namespaced_name(&handle.server, &tool.name),
                    server: handle.server.clone(),
                    native_name: tool.name,
                    description: tool.description,
                    input_schema: tool.input_schema.unwrap_or_else(empty_object_schema),
                });
            }
        }
        self.catalog = ToolCatalog::from_entries(entries)?;
        Ok(())
    }

    /// Route one tool call to the owning session and normalize its result.
    ///
    /// An unknown namespaced name fails before any session is contacted,
    /// with the error enumerating every registered name.
    pub async fn dispatch(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<DispatchOutcome, HostError> {
        let descriptor = match self.catalog.get(name) {
            Some(descriptor) => descriptor.clone(),
            None => {
                return Err(HostError::Dispatch {
                    name: name.to_string(),
                    known: self.catalog.names(),
                })
            }
        };

        let tool_args = adapt_arguments(&descriptor, arguments);
        self.sink.write(
            EventKind::CallToolRequest,
            json!({
                "server": descriptor.server,
                "tool": descriptor.native_name,
                "args": tool_args,
            }),
        );

        let handle = self
            .sessions
            .iter_mut()
            .find(|handle| handle.server == descriptor.server)
            .ok_or_else(|| HostError::Transport {
                server: descriptor.server.clone(),
                message: "session is not open".to_string(),
            })?;

        let outcome = handle
            .session
            .call_tool(&descriptor.native_name, tool_args)
            .await
            .map_err(|err| HostError::ToolExecution {
                server: descriptor.server.clone(),
                tool: descriptor.native_name.clone(),
                message: err.to_string(),
            })?;

        let payload = DispatchOutcome {
            server: descriptor.server,
            tool: descriptor.native_name,
            text: outcome.joined_text(),
            structured: outcome.structured,
        };
        self.sink.write(
            EventKind::CallToolResponse,
            serde_json::to_value(&payload).unwrap_or(Value::Null),
        );
        Ok(payload)
    }

    /// Close every open session, tolerating individual failures.
    ///
    /// Every close is attempted even when earlier ones fail; the session set
    /// and catalog are empty on return either way, so the host can be
    /// reconnected. Aggregated failures come back as a single teardown error.
    /// Calling this on an already-disconnected host is a no-op.
    pub async fn disconnect_all(&mut self) -> Result<(), HostError> {
        let mut failures = Vec::new();
        for mut handle in self.sessions.drain(..) {
            if let Err(err) = handle.session.close().await {
                warn!("closing '{}' failed: {}", handle.server, err);
                failures.push((handle.server, err.to_string()));
            }
        }
        self.catalog = ToolCatalog::default();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(HostError::Teardown(failures))
        }
    }
}

/// Apply the params-envelope adaptation.
///
/// Tools whose schema declares exactly one top-level property named `params`
/// expect their whole argument object nested under that key; callers passing
/// flat arguments get them wrapped. Arguments that already carry `params`
/// pass through, as do tools whose schema mixes `params` with siblings (an
/// ambiguous declaration that is logged and left alone).
fn adapt_arguments(descriptor: &ToolDescriptor, arguments: Value) -> Value {
    let Some(props) = descriptor
        .input_schema
        .get("properties")
        .and_then(Value::as_object)
    else {
        return arguments;
    };
    if !props.contains_key("params") {
        return arguments;
    }
    if props.len() > 1 {
        warn!(
            "tool '{}' declares 'params' alongside {} sibling properties; arguments forwarded unchanged",
            descriptor.name,
            props.len() - 1
        );
        return arguments;
    }
    if arguments.get("params").is_some() {
        return arguments;
    }
    json!({"params": arguments})
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor_with_schema(schema: Value) -> ToolDescriptor {
        ToolDescriptor {
            name: "movies__search".to_string(),
            server: "movies".to_string(),
            native_name: "search".to_string(),
            description: String::new(),
            input_schema: schema,
        }
    }

    #[test]
    fn flat_arguments_are_wrapped_for_params_envelope_tools() {
        let descriptor = descriptor_with_schema(json!({
            "type": "object",
            "properties": {"params": {"type": "object"}}
        }));
        let adapted = adapt_arguments(&descriptor, json!({"a": 1}));
        assert_eq!(adapted, json!({"params": {"a": 1}}));
    }

    #[test]
    fn pre_wrapped_arguments_pass_through() {
        let descriptor = descriptor_with_schema(json!({
            "type": "object",
            "properties": {"params": {"type": "object"}}
        }));
        let adapted = adapt_arguments(&descriptor, json!({"params": {"a": 1}}));
        assert_eq!(adapted, json!({"params": {"a": 1}}));
    }

    #[test]
    fn plain_schemas_are_untouched() {
        let descriptor = descriptor_with_schema(json!({
            "type": "object",
            "properties": {"a": {"type": "number"}, "b": {"type": "number"}}
        }));
        let adapted = adapt_arguments(&descriptor, json!({"a": 2, "b": 3}));
        assert_eq!(adapted, json!({"a": 2, "b": 3}));
    }

    #[test]
    fn ambiguous_params_sibling_schemas_are_untouched() {
        let descriptor = descriptor_with_schema(json!({
            "type": "object",
            "properties": {"params": {"type": "object"}, "mode": {"type": "string"}}
        }));
        let adapted = adapt_arguments(&descriptor, json!({"mode": "fast"}));
        assert_eq!(adapted, json!({"mode": "fast"}));
    }
}
