//! Session management.

use serde_json::{Map, Value};

use crate::bridge::{ToolHost, ToolOutput};
use crate::catalog::ToolCatalog;
use crate::{Error, Result};
use mcp::{Connection, ServerConfig, ServerInfo};

/// A live chat session: the tool-host connection plus the catalog fetched
/// once at connect time.
///
/// The session is an explicit value owned by the caller; dropping it tears
/// the tool server down on every exit path, interrupts included.
pub struct Session {
    connection: Connection,
    catalog: ToolCatalog,
    server: ServerInfo,
}

impl Session {
    /// Spawn the tool server, run the handshake, and fetch the catalog.
    ///
    /// Any failure here is fatal for the session.
    pub async fn connect(config: &ServerConfig) -> Result<Self> {
        let connection = Connection::spawn(config).await?;
        let server = connection.initialize().await?;
        let tools = connection.list_tools().await?;
        let catalog = ToolCatalog::new(tools);

        tracing::info!(
            server = %server.name,
            tools = catalog.len(),
            "connected to tool server"
        );

        Ok(Self {
            connection,
            catalog,
            server,
        })
    }

    /// The catalog discovered at connect time.
    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Info the server reported during the handshake.
    pub fn server(&self) -> &ServerInfo {
        &self.server
    }

    /// End the session and terminate the tool server.
    pub async fn close(self) -> Result<()> {
        self.connection.shutdown().await.map_err(Error::Connect)
    }
}

impl ToolHost for Session {
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolOutput {
        match self.connection.call_tool(name, Some(arguments)).await {
            Ok(result) => {
                if result.content.is_empty()
                    && let Some(value) = result.structured_content
                {
                    ToolOutput::Value(value)
                } else {
                    ToolOutput::Items(result.content)
                }
            }
            Err(e) => ToolOutput::host_failure(e),
        }
    }
}
