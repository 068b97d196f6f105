//! Stdio transport: a child process speaking newline-delimited JSON-RPC.

use super::RequestTracker;
use crate::error::McpError;
use crate::jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Async stdio transport for one tool server process.
pub struct StdioTransport {
    tracker: RequestTracker,
    write_tx: mpsc::Sender<String>,
    reader_handle: JoinHandle<()>,
    writer_handle: JoinHandle<()>,
    child: Child,
}

impl StdioTransport {
    /// Spawn the server process and start background reader/writer tasks.
    pub fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        timeout_ms: u64,
    ) -> Result<Self, McpError> {
        let mut child = Command::new(command)
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| McpError::SpawnFailed {
                name: command.to_string(),
                source: e,
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(McpError::Protocol(format!(
                "'{command}' started without piped stdio"
            )));
        };

        let tracker = RequestTracker::new(timeout_ms);

        let (write_tx, mut write_rx) = mpsc::channel::<String>(64);
        let writer_handle = tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(mut msg) = write_rx.recv().await {
                msg.push('\n');
                if stdin.write_all(msg.as_bytes()).await.is_err() || stdin.flush().await.is_err() {
                    break;
                }
            }
        });

        let dispatcher = tracker.dispatcher();
        let reader_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                dispatcher.dispatch(&line).await;
            }
            // stdout closed: the process is gone, nobody will answer
            dispatcher.close_all().await;
        });

        Ok(Self {
            tracker,
            write_tx,
            reader_handle,
            writer_handle,
            child,
        })
    }

    pub async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, McpError> {
        let (id, rx) = self.tracker.register().await;
        let serialized = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;

        if self.write_tx.send(serialized).await.is_err() {
            self.tracker.forget(id).await;
            return Err(McpError::Protocol("Writer channel closed".to_string()));
        }

        self.tracker.wait(id, method, rx).await
    }

    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        let serialized = serde_json::to_string(&JsonRpcNotification::new(method, params))?;
        self.write_tx
            .send(serialized)
            .await
            .map_err(|_| McpError::Protocol("Writer channel closed".to_string()))
    }

    /// Close stdin, give the process a moment to exit, then kill it.
    pub async fn shutdown(self) {
        let Self {
            write_tx,
            reader_handle,
            writer_handle,
            mut child,
            ..
        } = self;

        drop(write_tx);

        let graceful =
            tokio::time::timeout(std::time::Duration::from_secs(2), child.wait()).await;
        if graceful.is_err() {
            let _ = child.kill().await;
        }

        reader_handle.abort();
        writer_handle.abort();
    }
}
