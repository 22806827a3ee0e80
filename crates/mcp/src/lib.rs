//! MCP (Model Context Protocol) client library.
//!
//! This crate provides a client for communicating with MCP tool servers via
//! stdio. It covers exactly the surface a chat client needs: spawn the server
//! subprocess, perform the initialize handshake, list the tools it offers,
//! and call them.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{Connection, ServerConfig};
//! use std::collections::HashMap;
//!
//! # async fn example() -> mcp::Result<()> {
//! let config = ServerConfig {
//!     command: "python".to_string(),
//!     args: vec!["research_server.py".to_string()],
//!     env: HashMap::new(),
//! };
//!
//! let conn = Connection::spawn(&config).await?;
//! let info = conn.initialize().await?;
//! println!("connected to {}", info.name);
//!
//! for tool in conn.list_tools().await? {
//!     println!("tool: {}", tool.name);
//! }
//!
//! let result = conn
//!     .call_tool("search_papers", serde_json::json!({"topic": "transformers"})
//!         .as_object().cloned())
//!     .await?;
//! # let _ = result;
//!
//! conn.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod protocol;

pub use client::{Connection, MAX_RESPONSE_SIZE, REQUEST_TIMEOUT, ServerConfig};
pub use error::{Error, Result};
pub use protocol::{
    CallToolParams, CallToolResult, Content, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, RequestId, ServerCapabilities, ServerInfo,
    Tool,
};
