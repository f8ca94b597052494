//! Stdio tool provider: newline-delimited JSON-RPC 2.0 over a child process
//! (MCP-style initialize / tools/list / tools/call).

use crate::config::ProviderServerConfig;
use crate::providers::{OperationInfo, ProviderError, ToolProvider};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Tool provider over a spawned child process. Requests are serialized through
/// a mutex; each carries the configured timeout. The child is killed when the
/// provider is dropped.
pub struct StdioProvider {
    name: String,
    timeout: Duration,
    io: Mutex<ProviderIo>,
}

struct ProviderIo {
    _child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl StdioProvider {
    /// Spawn the provider process and run the initialize handshake.
    pub async fn spawn(
        config: &ProviderServerConfig,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProviderError::Protocol("child stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProviderError::Protocol("child stdout unavailable".to_string()))?;
        let provider = Self {
            name: config.name.clone(),
            timeout,
            io: Mutex::new(ProviderIo {
                _child: child,
                stdin,
                stdout: BufReader::new(stdout),
            }),
        };
        provider.initialize().await?;
        Ok(provider)
    }

    async fn initialize(&self) -> Result<(), ProviderError> {
        self.request(
            "initialize",
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": "courier",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        )
        .await?;
        self.notify("notifications/initialized", json!({})).await
    }

    /// Send one request and read lines until the matching response id arrives.
    /// Unparseable lines (provider banners) and notifications are skipped.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = uuid::Uuid::new_v4().to_string();
        let frame = serde_json::to_string(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .map_err(|e| ProviderError::Protocol(e.to_string()))?;
        let mut io = self.io.lock().await;
        tokio::time::timeout(self.timeout, async {
            io.stdin.write_all(frame.as_bytes()).await?;
            io.stdin.write_all(b"\n").await?;
            io.stdin.flush().await?;
            loop {
                let mut line = String::new();
                let n = io.stdout.read_line(&mut line).await?;
                if n == 0 {
                    return Err(ProviderError::Closed);
                }
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let value: Value = match serde_json::from_str(line) {
                    Ok(v) => v,
                    Err(_) => continue,
                };
                if value.get("id").and_then(Value::as_str) != Some(id.as_str()) {
                    continue;
                }
                if let Some(err) = value.get("error") {
                    let msg = err
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error");
                    return Err(ProviderError::Rpc(msg.to_string()));
                }
                return Ok(value.get("result").cloned().unwrap_or(Value::Null));
            }
        })
        .await
        .map_err(|_| ProviderError::Timeout)?
    }

    async fn notify(&self, method: &str, params: Value) -> Result<(), ProviderError> {
        let frame = serde_json::to_string(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }))
        .map_err(|e| ProviderError::Protocol(e.to_string()))?;
        let mut io = self.io.lock().await;
        io.stdin.write_all(frame.as_bytes()).await?;
        io.stdin.write_all(b"\n").await?;
        io.stdin.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl ToolProvider for StdioProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_operations(&self) -> Result<Vec<OperationInfo>, ProviderError> {
        let result = self.request("tools/list", json!({})).await?;
        let tools = result
            .get("tools")
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::Protocol("tools/list result missing tools".to_string()))?;
        Ok(tools
            .iter()
            .filter_map(|t| {
                let name = t.get("name").and_then(Value::as_str)?;
                Some(OperationInfo {
                    name: name.to_string(),
                    description: t
                        .get("description")
                        .and_then(Value::as_str)
                        .map(String::from),
                })
            })
            .collect())
    }

    async fn invoke(
        &self,
        operation: &str,
        args: serde_json::Value,
    ) -> Result<String, ProviderError> {
        let result = self
            .request("tools/call", json!({ "name": operation, "arguments": args }))
            .await?;
        extract_content_text(&result).ok_or_else(|| {
            ProviderError::Protocol("tools/call result missing content text".to_string())
        })
    }
}

/// Result text of a tools/call: first text entry of result.content.
fn extract_content_text(result: &Value) -> Option<String> {
    result
        .get("content")?
        .as_array()?
        .iter()
        .find_map(|c| c.get("text").and_then(Value::as_str))
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_config(command: &str, args: &[&str]) -> ProviderServerConfig {
        ProviderServerConfig {
            name: "test".to_string(),
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            env: Default::default(),
            intent: "weather".to_string(),
            operation: None,
        }
    }

    #[test]
    fn content_text_takes_first_text_entry() {
        let result = json!({
            "content": [
                { "type": "text", "text": "30 and sunny" },
                { "type": "text", "text": "ignored" }
            ]
        });
        assert_eq!(extract_content_text(&result).as_deref(), Some("30 and sunny"));
        assert_eq!(extract_content_text(&json!({ "content": [] })), None);
        assert_eq!(extract_content_text(&json!({})), None);
    }

    #[tokio::test]
    async fn unresponsive_provider_times_out() {
        let config = server_config("sleep", &["5"]);
        let err = StdioProvider::spawn(&config, Duration::from_millis(200))
            .await
            .err()
            .expect("spawn should fail");
        assert!(matches!(err, ProviderError::Timeout));
    }

    #[tokio::test]
    async fn missing_binary_fails_to_spawn() {
        let config = server_config("courier-no-such-binary", &[]);
        let err = StdioProvider::spawn(&config, Duration::from_secs(1))
            .await
            .err()
            .expect("spawn should fail");
        assert!(matches!(err, ProviderError::Io(_)));
    }
}
