// src/mcphost/mod.rs

pub mod catalog;
pub mod chat;
pub mod clients;
pub mod completion;
pub mod error;
pub mod event;
pub mod host;
pub mod jsonrpc;
pub mod server_def;
pub mod session;
pub mod sessions;

// Export the two entry-point types so they read as mcphost::Host and
// mcphost::ChatSession instead of going through their modules.
pub use chat::ChatSession;
pub use host::Host;
