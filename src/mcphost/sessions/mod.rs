//! Transport-specific session constructions.
//!
//! Each submodule implements [`ToolSession`](crate::mcphost::session::ToolSession)
//! for one transport. Selection happens once, in
//! [`session::open`](crate::mcphost::session::open).

pub mod stateless_http;
pub mod stdio;
pub mod streaming_http;

pub use stateless_http::StatelessHttpSession;
pub use stdio::StdioSession;
pub use streaming_http::StreamingHttpSession;
