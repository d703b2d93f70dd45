//! MCP (Model Context Protocol) host for taskbridge.
//!
//! Speaks newline-delimited JSON-RPC 2.0 on stdio and exposes every action
//! in a [`taskbridge_core::Registry`] as an MCP tool.
//!
//! ```ignore
//! let server = McpServer::new(Arc::new(registry));
//! server.run_stdio().await?;
//! ```

pub mod protocol;
pub mod server;
pub mod transport;

pub use server::McpServer;
