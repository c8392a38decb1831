use super::descriptor::ToolDescriptor;
use super::error::ToolProviderError;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const PROTOCOL_VERSION: &str = "2025-06-18";

type PendingMap = HashMap<String, oneshot::Sender<Result<Value, ToolProviderError>>>;

/// A spawned MCP server speaking newline-delimited JSON-RPC on stdio.
pub(crate) struct McpProcess {
    inner: Arc<McpProcessInner>,
    child: AsyncMutex<Option<Child>>,
    reader: AsyncMutex<Option<JoinHandle<()>>>,
}

struct McpProcessInner {
    server: String,
    writer: AsyncMutex<Option<BufWriter<ChildStdin>>>,
    pending: AsyncMutex<PendingMap>,
    id_counter: AtomicU64,
    exited: AtomicBool,
}

impl McpProcess {
    pub(crate) fn spawn(
        server: &str,
        program: &Path,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Self, ToolProviderError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| ToolProviderError::Spawn {
            server: server.to_string(),
            source,
        })?;
        debug!(server, program = %program.display(), pid = child.id(), "Spawned MCP server");

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(ToolProviderError::Transport {
                server: server.to_string(),
                message: "failed to capture server stdio".to_string(),
            });
        };

        let inner = Arc::new(McpProcessInner {
            server: server.to_string(),
            writer: AsyncMutex::new(Some(BufWriter::new(stdin))),
            pending: AsyncMutex::new(HashMap::new()),
            id_counter: AtomicU64::new(1),
            exited: AtomicBool::new(false),
        });

        let reader_inner = Arc::clone(&inner);
        let reader = tokio::spawn(async move {
            reader_inner.reader_loop(stdout).await;
        });

        Ok(Self {
            inner,
            child: AsyncMutex::new(Some(child)),
            reader: AsyncMutex::new(Some(reader)),
        })
    }

    /// `initialize` request followed by the `notifications/initialized`
    /// notification.
    pub(crate) async fn handshake(&self) -> Result<Value, ToolProviderError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {}
        });
        let result = self.inner.send_request("initialize", params).await?;
        if let Some(info) = result.get("serverInfo") {
            debug!(server = %self.inner.server, server_info = %info, "MCP handshake accepted");
        }
        self.inner
            .send_notification("notifications/initialized", json!({}))
            .await?;
        Ok(result)
    }

    pub(crate) async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolProviderError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.inner.send_request("tools/list", params).await?;
            if let Some(items) = result.get("tools").and_then(Value::as_array) {
                tools.extend(items.iter().filter_map(parse_tool));
            }
            cursor = result
                .get("nextCursor")
                .and_then(Value::as_str)
                .filter(|next| !next.is_empty())
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }
        Ok(tools)
    }

    pub(crate) async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value, ToolProviderError> {
        let params = json!({
            "name": tool,
            "arguments": match arguments {
                Value::Null => Value::Object(Default::default()),
                other => other,
            }
        });
        self.inner.send_request("tools/call", params).await
    }

    /// Closes stdin, kills the child and fails whatever is still in flight.
    pub(crate) async fn shutdown(&self) {
        self.inner.writer.lock().await.take();

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(err) = child.kill().await {
                debug!(
                    server = %self.inner.server,
                    %err,
                    "failed to kill MCP server process (may have already exited)"
                );
            }
            if let Err(err) = child.wait().await {
                debug!(server = %self.inner.server, %err, "failed to reap MCP server process");
            }
        }

        if let Some(reader) = self.reader.lock().await.take() {
            reader.abort();
        }
        self.inner.exited.store(true, Ordering::SeqCst);
        self.inner.fail_all_pending().await;
    }
}

impl McpProcessInner {
    async fn reader_loop(self: Arc<Self>, stdout: ChildStdout) {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => self.handle_line(&buf).await,
                Err(err) => {
                    warn!(server = %self.server, %err, "failed to read from MCP server stdout");
                    break;
                }
            }
        }

        debug!(server = %self.server, "MCP server closed its stdout");
        self.exited.store(true, Ordering::SeqCst);
        self.writer.lock().await.take();
        self.fail_all_pending().await;
    }

    async fn handle_line(&self, raw: &[u8]) {
        let Ok(line) = std::str::from_utf8(raw) else {
            let lossy = String::from_utf8_lossy(raw);
            debug!(
                server = %self.server,
                line = lossy.trim_end(),
                "skipping non UTF-8 line from MCP server"
            );
            return;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        if trimmed.starts_with('\u{1b}') {
            debug!(
                server = %self.server,
                line = trimmed,
                "skipping non-JSON ANSI log line from MCP server"
            );
            return;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => {
                if let Err(err) = self.process_inbound_message(value).await {
                    warn!(server = %self.server, %err, "failed to process message from MCP server");
                }
            }
            Err(source) => {
                debug!(
                    server = %self.server,
                    line = trimmed,
                    %source,
                    "skipping non-JSON line from MCP server"
                );
            }
        }
    }

    async fn process_inbound_message(&self, value: Value) -> Result<(), ToolProviderError> {
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .map(str::to_string);
        match (value.get("id").cloned(), method) {
            (Some(id), Some(method)) => self.handle_server_request(id, &method).await,
            (Some(id), None) => {
                self.handle_response(id, value).await;
                Ok(())
            }
            (None, Some(method)) => {
                debug!(server = %self.server, method = %method, "received notification from server");
                Ok(())
            }
            (None, None) => Ok(()),
        }
    }

    async fn handle_response(&self, id: Value, value: Value) {
        let Some(key) = response_key(&id) else {
            return;
        };
        let Some(sender) = self.pending.lock().await.remove(&key) else {
            debug!(server = %self.server, response_id = %key, "received response for unknown request");
            return;
        };

        let outcome = match value.get("error") {
            Some(error) => Err(ToolProviderError::Rpc {
                server: self.server.clone(),
                code: error.get("code").and_then(Value::as_i64).unwrap_or(-32000),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            }),
            None => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
        };
        let _ = sender.send(outcome);
    }

    async fn handle_server_request(&self, id: Value, method: &str) -> Result<(), ToolProviderError> {
        if method == "ping" {
            return self
                .write_message(&json!({ "jsonrpc": "2.0", "id": id, "result": {} }))
                .await;
        }
        warn!(server = %self.server, method, "server sent unsupported request");
        let error = json!({
            "code": -32601,
            "message": format!("client does not implement method '{method}'"),
        });
        self.write_message(&json!({ "jsonrpc": "2.0", "id": id, "error": error }))
            .await
    }

    async fn send_request(&self, method: &str, params: Value) -> Result<Value, ToolProviderError> {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        if self.exited.load(Ordering::SeqCst) {
            self.pending.lock().await.remove(&id);
            return Err(ToolProviderError::Terminated {
                server: self.server.clone(),
            });
        }

        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        if let Err(err) = self.write_message(&payload).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }
        debug!(server = %self.server, method, request_id = %id, "sent request");

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ToolProviderError::Cancelled {
                server: self.server.clone(),
            }),
        }
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), ToolProviderError> {
        self.write_message(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        }))
        .await
    }

    async fn write_message(&self, message: &Value) -> Result<(), ToolProviderError> {
        let mut encoded =
            serde_json::to_string(message).map_err(|source| ToolProviderError::InvalidJson {
                server: self.server.clone(),
                source,
            })?;
        encoded.push('\n');

        let mut writer = self.writer.lock().await;
        let stream = writer
            .as_mut()
            .ok_or_else(|| self.transport_error("server stdin is closed"))?;
        stream
            .write_all(encoded.as_bytes())
            .await
            .map_err(|source| self.transport_error(source.to_string()))?;
        stream
            .flush()
            .await
            .map_err(|source| self.transport_error(source.to_string()))
    }

    async fn fail_all_pending(&self) {
        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(ToolProviderError::Terminated {
                server: self.server.clone(),
            }));
        }
    }

    fn next_id(&self) -> String {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        format!("req-{id}")
    }

    fn transport_error(&self, message: impl Into<String>) -> ToolProviderError {
        ToolProviderError::Transport {
            server: self.server.clone(),
            message: message.into(),
        }
    }
}

fn response_key(id: &Value) -> Option<String> {
    match id {
        Value::String(value) => Some(value.clone()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}

fn parse_tool(entry: &Value) -> Option<ToolDescriptor> {
    let name = entry.get("name").and_then(Value::as_str)?;
    let description = entry
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let schema = entry.get("inputSchema").cloned().unwrap_or(Value::Null);
    Some(ToolDescriptor::new(name, description, schema))
}
