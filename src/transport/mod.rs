//! Outer protocols over the [`Dispatcher`](crate::dispatch::Dispatcher).
//!
//! - **stdio**: newline-delimited JSON-RPC 2.0 (MCP tool calls)
//! - **http**: axum router with per-tool GET endpoints and a generic POST

pub mod codec;
pub mod http;
pub mod stdio;

pub use self::http::{router, serve as serve_http};
pub use self::stdio::{handle_line, serve as serve_stdio};
