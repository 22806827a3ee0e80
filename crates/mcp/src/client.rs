//! Connection to an MCP server process (spawn, handshake, request/response).

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, RequestId, ServerInfo, Tool,
};

/// Timeout for a single request/response exchange.
///
/// Tool calls may block while the server computes (e.g. a remote search), so
/// this is deliberately generous.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum size of a single response line (4MB).
/// Sized for large tool outputs (search results, file contents).
pub const MAX_RESPONSE_SIZE: usize = 4 * 1024 * 1024;

/// Configuration for spawning an MCP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// A live connection to an MCP server subprocess.
///
/// One connection is owned by exactly one session; the internal locks only
/// serialize the request/response exchange on the shared pipes.
pub struct Connection {
    child: Mutex<Child>,
    stdin: Mutex<tokio::process::ChildStdin>,
    stdout: Mutex<BufReader<tokio::process::ChildStdout>>,
    next_id: AtomicI64,
    initialized: AtomicBool,
}

impl Connection {
    /// Spawn the server process and wire up its stdio.
    pub async fn spawn(config: &ServerConfig) -> Result<Self> {
        tracing::debug!(command = %config.command, args = ?config.args, "spawning MCP server");

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Spawn(std::io::Error::other("failed to capture stdin")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Spawn(std::io::Error::other("failed to capture stdout")))?;

        Ok(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout)),
            next_id: AtomicI64::new(1),
            initialized: AtomicBool::new(false),
        })
    }

    /// Perform the MCP handshake. Must be called before any other operation.
    pub async fn initialize(&self) -> Result<ServerInfo> {
        let params = InitializeParams::default();
        let result: InitializeResult = self.request("initialize", Some(params)).await?;

        self.notify("notifications/initialized", None::<()>).await?;
        self.initialized.store(true, Ordering::SeqCst);

        tracing::debug!(
            server = %result.server_info.name,
            protocol = %result.protocol_version,
            "MCP server initialized"
        );

        Ok(result.server_info)
    }

    /// Fetch the tool descriptors the server offers.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        self.ensure_initialized()?;
        let result: ListToolsResult = self.request("tools/list", None::<()>).await?;
        Ok(result.tools)
    }

    /// Call a tool by name.
    ///
    /// A result flagged `isError` surfaces as [`Error::ToolCallFailed`] with
    /// the joined text content as the message.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<CallToolResult> {
        self.ensure_initialized()?;

        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };

        let result: CallToolResult = self.request("tools/call", Some(params)).await?;

        if result.is_error {
            let error_text = result
                .content
                .iter()
                .filter_map(|c| c.as_text())
                .collect::<Vec<_>>()
                .join("\n");
            return Err(Error::ToolCallFailed(error_text));
        }

        Ok(result)
    }

    /// Check if the server process is still running.
    pub async fn is_running(&self) -> bool {
        let mut child = self.child.lock().await;
        matches!(child.try_wait(), Ok(None))
    }

    /// Terminate the server process.
    ///
    /// Dropping the connection also kills the child (`kill_on_drop`); this
    /// just makes the teardown explicit on the clean path.
    pub async fn shutdown(self) -> Result<()> {
        let mut child = self.child.lock().await;
        let _ = child.kill().await;
        Ok(())
    }

    // --- Internal ---

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn request<P, R>(&self, method: &str, params: Option<P>) -> Result<R>
    where
        P: serde::Serialize,
        R: serde::de::DeserializeOwned,
    {
        let id = self.next_request_id();
        let mut request = JsonRpcRequest::new(id.clone(), method);
        if let Some(p) = params {
            request = request.with_params(p);
        }

        let request_json = serde_json::to_string(&request)?;
        {
            let mut stdin = self.stdin.lock().await;
            stdin.write_all(request_json.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await?;
        }

        let response = timeout(REQUEST_TIMEOUT, self.read_response(&id))
            .await
            .map_err(|_| Error::Timeout)??;

        let result_value = response.into_result()?;
        let result: R = serde_json::from_value(result_value)?;

        Ok(result)
    }

    async fn notify<P>(&self, method: &str, params: Option<P>) -> Result<()>
    where
        P: serde::Serialize,
    {
        // Notifications have no ID
        let notification = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params.and_then(|p| serde_json::to_value(p).ok())
        });

        let notification_json = serde_json::to_string(&notification)?;
        {
            let mut stdin = self.stdin.lock().await;
            stdin.write_all(notification_json.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await?;
        }

        Ok(())
    }

    /// Read lines until the response with the expected ID arrives.
    ///
    /// Server-initiated notifications and responses to requests whose caller
    /// has gone away (an interrupted query) are skipped, so a cancelled call
    /// cannot desync the channel for the next one.
    async fn read_response(&self, expected: &RequestId) -> Result<JsonRpcResponse> {
        let mut stdout = self.stdout.lock().await;

        loop {
            let mut line = String::new();
            let bytes_read = stdout.read_line(&mut line).await?;
            if bytes_read == 0 {
                return Err(Error::ServerExited);
            }

            if line.len() > MAX_RESPONSE_SIZE {
                return Err(Error::OutputTooLarge {
                    size: line.len(),
                    max: MAX_RESPONSE_SIZE,
                });
            }

            let Ok(response) = serde_json::from_str::<JsonRpcResponse>(&line) else {
                tracing::debug!("skipping non-response line from server");
                continue;
            };

            if &response.id == expected {
                return Ok(response);
            }
            tracing::debug!(id = ?response.id, "skipping stale response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_deserializes_with_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"command": "python", "args": ["research_server.py"]}"#)
                .unwrap();
        assert_eq!(config.command, "python");
        assert_eq!(config.args, vec!["research_server.py"]);
        assert!(config.env.is_empty());
    }
}
