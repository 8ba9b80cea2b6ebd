//! MCP (Model Context Protocol) plumbing
//!
//! Uses the official rmcp SDK on both sides of the tool boundary:
//!
//! - `client` / `channel` / `transport`: reach tool servers (child process
//!   over stdio, Unix socket, streamable HTTP) and merge their tools
//! - `server`: expose the power system tools to any MCP client
//!
//! # Example
//!
//! ```rust,ignore
//! use gridagent_core::config::AgentConfig;
//! use gridagent_core::mcp::ToolTransport;
//!
//! let transport = ToolTransport::from_config(&AgentConfig::default(), logger);
//! let tools = transport.list_tools().await;
//! let result = transport.invoke(&call).await;
//! ```

mod channel;
mod client;
mod server;
mod transport;

pub use channel::{LocalChannel, RemoteChannel, ToolChannel};
pub use client::{McpClient, McpError, McpResult};
pub use server::{serve_stdio, GridToolServer};
pub use transport::ToolTransport;
