//! MCP server that reads JSON-RPC 2.0 messages from stdin and writes
//! responses to stdout.
//!
//! Requests are read one per line. Tool calls run on the blocking pool so a
//! slow query never stalls the reader, and every response goes through a
//! single writer task so lines never interleave. The analysis model is
//! built in the background from server start; calls that arrive earlier
//! fail with `ContextNotReadyError`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::analysis::JavaAnalysis;
use crate::context::AnalysisContext;
use crate::dispatch::{arguments_object, Dispatcher};
use crate::errors::Result;
use crate::registry::Registry;

use super::transport::{ErrorCode, JsonRpcRequest, JsonRpcResponse, ToolDefinition};

const PROTOCOL_VERSION: &str = "2024-11-05";

/// Runtime statistics for the MCP server.
pub struct ServerStats {
    started_at: Instant,
    total_requests: AtomicU64,
    tool_calls: AtomicU64,
    errors: AtomicU64,
    tool_call_counts: Mutex<HashMap<String, u64>>,
}

impl ServerStats {
    fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_requests: AtomicU64::new(0),
            tool_calls: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            tool_call_counts: Mutex::new(HashMap::new()),
        }
    }

    fn record_tool_call(&self, name: &str) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut counts) = self.tool_call_counts.lock() {
            *counts.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    fn record_response(&self, response: &JsonRpcResponse) {
        if response.is_error() {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn to_json(&self) -> Value {
        let tool_counts: Value = self
            .tool_call_counts
            .lock()
            .map(|counts| {
                let mut sorted: Vec<_> = counts.iter().collect();
                sorted.sort();
                let map: serde_json::Map<String, Value> = sorted
                    .into_iter()
                    .map(|(name, count)| (name.clone(), json!(count)))
                    .collect();
                Value::Object(map)
            })
            .unwrap_or(json!({}));

        json!({
            "uptime_secs": self.started_at.elapsed().as_secs(),
            "total_requests": self.total_requests.load(Ordering::Relaxed),
            "tool_calls": self.tool_calls.load(Ordering::Relaxed),
            "errors": self.errors.load(Ordering::Relaxed),
            "tool_call_counts": tool_counts,
        })
    }
}

/// One MCP session: a registry bound to one analysis context.
pub struct McpServer {
    dispatcher: Dispatcher,
    stats: ServerStats,
}

impl McpServer {
    pub fn new(registry: Arc<Registry>, context: Arc<AnalysisContext>) -> Self {
        Self {
            dispatcher: Dispatcher::new(registry, context),
            stats: ServerStats::new(),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Builds the analysis model on the blocking pool.
    pub fn start_initialization<F>(&self, build: F) -> JoinHandle<()>
    where
        F: FnOnce(&Path) -> Result<JavaAnalysis> + Send + 'static,
    {
        let context = self.context_handle();
        tokio::task::spawn_blocking(move || {
            // Failure is recorded in the context and logged there.
            let _ = context.initialize(build);
        })
    }

    fn context_handle(&self) -> Arc<AnalysisContext> {
        self.dispatcher.context_handle()
    }

    /// Serves stdin/stdout until stdin is closed.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serves newline-delimited JSON-RPC from `input` to `output` until EOF,
    /// then waits for in-flight calls and closes the analysis context.
    pub async fn serve<R, W>(self: Arc<Self>, input: R, output: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let writer = tokio::spawn(write_responses(rx, output));
        let mut in_flight = JoinSet::new();
        let mut lines = BufReader::new(input).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "failed to read from input");
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(line) {
                Ok(request) => request,
                Err(e) => {
                    let response = JsonRpcResponse::error(
                        Value::Null,
                        ErrorCode::ParseError,
                        format!("failed to parse JSON-RPC request: {}", e),
                    );
                    self.stats.total_requests.fetch_add(1, Ordering::Relaxed);
                    self.stats.record_response(&response);
                    let _ = tx.send(response);
                    continue;
                }
            };
            self.stats.total_requests.fetch_add(1, Ordering::Relaxed);
            debug!(method = %request.method, "received request");

            if request.method == "tools/call" {
                let server = Arc::clone(&self);
                let tx = tx.clone();
                in_flight.spawn(async move {
                    let worker = Arc::clone(&server);
                    let id = request.id.clone();
                    let response = match tokio::task::spawn_blocking(move || {
                        worker.handle_tools_call(request.id, request.params)
                    })
                    .await
                    {
                        Ok(response) => response,
                        Err(e) => JsonRpcResponse::error(
                            id,
                            ErrorCode::InternalError,
                            format!("tool call aborted: {}", e),
                        ),
                    };
                    server.stats.record_response(&response);
                    let _ = tx.send(response);
                });
            } else if let Some(response) = self.handle_request(&request) {
                self.stats.record_response(&response);
                let _ = tx.send(response);
            }
        }

        while in_flight.join_next().await.is_some() {}
        self.dispatcher.context().close();
        drop(tx);
        if let Err(e) = writer.await {
            warn!(error = %e, "response writer stopped abnormally");
        }
        info!(stats = %self.stats.to_json(), "server stopped");
        Ok(())
    }

    /// Handles every method except `tools/call`. Returns `None` for
    /// notifications.
    pub fn handle_request(&self, request: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone();
        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(id)),
            "initialized" => None,
            _ if request.is_notification() => None,
            "tools/list" => Some(self.handle_tools_list(id)),
            "tools/call" => Some(self.handle_tools_call(id, request.params.clone())),
            "ping" => Some(JsonRpcResponse::success(id, json!({}))),
            _ => Some(JsonRpcResponse::error(
                id,
                ErrorCode::MethodNotFound,
                format!("method not found: {}", request.method),
            )),
        }
    }

    fn handle_initialize(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "cocoa",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        let tools: Vec<ToolDefinition> = self
            .dispatcher
            .registry()
            .list()
            .into_iter()
            .map(ToolDefinition::from)
            .collect();
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    /// Handles `tools/call`: `{"name": ..., "arguments": {...}}`.
    pub fn handle_tools_call(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let mut params = match params {
            Some(Value::Object(map)) => map,
            _ => {
                return JsonRpcResponse::error(
                    id,
                    ErrorCode::InvalidParams,
                    "missing params for tools/call".to_string(),
                );
            }
        };

        let name = match params.get("name").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => {
                return JsonRpcResponse::error(
                    id,
                    ErrorCode::InvalidParams,
                    "missing 'name' in tools/call params".to_string(),
                );
            }
        };
        self.stats.record_tool_call(&name);

        let result = arguments_object(&name, params.remove("arguments"))
            .and_then(|arguments| self.dispatcher.invoke(&name, arguments));
        match result {
            Ok(value) => JsonRpcResponse::success(id, tool_result(value)),
            Err(e) => JsonRpcResponse::failure(id, &e),
        }
    }
}

/// Wraps a wire value as MCP tool-call content. Strings go out as bare text.
fn tool_result(value: Value) -> Value {
    let text = match &value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let mut result = json!({
        "content": [{ "type": "text", "text": text }]
    });
    if value.is_object() {
        result["structuredContent"] = value;
    }
    result
}

async fn write_responses<W>(mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>, mut output: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let line = match serde_json::to_string(&response) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to serialize response");
                continue;
            }
        };
        if let Err(e) = write_line(&mut output, &line).await {
            error!(error = %e, "failed to write response");
            break;
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_adds_structured_content_for_objects() {
        let result = tool_result(json!({"a": 1}));
        assert_eq!(result["content"][0]["text"], r#"{"a":1}"#);
        assert_eq!(result["structuredContent"]["a"], 1);

        let result = tool_result(json!([1, 2]));
        assert!(result.get("structuredContent").is_none());
        assert_eq!(result["content"][0]["text"], "[1,2]");
    }

    #[test]
    fn test_tool_result_string_is_bare_text() {
        let result = tool_result(json!("/tmp/project"));
        assert_eq!(result["content"][0]["text"], "/tmp/project");
        assert!(result.get("structuredContent").is_none());
    }
}
