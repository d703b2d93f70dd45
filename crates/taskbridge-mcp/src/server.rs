//! MCP server implementation.
//!
//! The server handles the MCP protocol lifecycle:
//! 1. Initialize - exchange capabilities
//! 2. Handle tool calls - dispatch through the action registry
//! 3. Shutdown - on EOF, wait for in-flight calls and flush their results
//!
//! Frames are read on a dedicated task. Every `tools/call` runs on its own
//! task so a slow operation never blocks `ping` or a cancellation, and
//! responses are written as they complete.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use serde_json::Value;
use taskbridge_core::{codes, CallEnvelope, Error, Registry, ResponseEnvelope, Result};
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::protocol::{
    CancelledParams, InitializeParams, InitializeResult, JsonRpcError, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, RequestId, ServerCapabilities, ServerInfo, ToolCallParams,
    ToolCallResult, ToolDefinition, ToolsCapability, ToolsListResult, MCP_VERSION,
};
use crate::transport::{Incoming, LineReader, LineWriter};

/// Inbound frames buffered between the reader task and the server loop.
const INBOUND_BUFFER: usize = 64;

pub const SERVER_NAME: &str = "taskbridge-mcp";

/// A finished tool call, tagged with the token it was spawned under.
struct Completion {
    token: u64,
    response: JsonRpcResponse,
}

type Completions = mpsc::UnboundedSender<Completion>;

/// Cancel handle for a running call. The token tells a reused request id
/// apart from the call that held it before.
struct InFlight {
    token: u64,
    cancel: oneshot::Sender<()>,
}

/// MCP server exposing every registered action as a tool.
pub struct McpServer {
    registry: Arc<Registry>,
    initialized: bool,
    in_flight: HashMap<RequestId, InFlight>,
    next_token: u64,
}

impl McpServer {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            initialized: false,
            in_flight: HashMap::new(),
            next_token: 0,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Serve on the process's stdin and stdout.
    pub async fn run_stdio(self) -> Result<()> {
        self.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve newline-delimited JSON-RPC until `reader` reaches EOF.
    pub async fn run<R, W>(mut self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        info!(operations = self.registry.len(), "Starting MCP server");

        let (incoming_tx, mut incoming_rx) = mpsc::channel(INBOUND_BUFFER);
        let reader_task = tokio::spawn(read_loop(LineReader::new(reader), incoming_tx));

        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let mut writer = LineWriter::new(writer);

        loop {
            tokio::select! {
                msg = incoming_rx.recv() => {
                    let Some(msg) = msg else {
                        info!("EOF received, shutting down");
                        break;
                    };
                    if let Some(resp) = self.handle_message(msg, &done_tx) {
                        writer.write(&resp).await.map_err(write_error)?;
                    }
                }
                Some(done) = done_rx.recv() => {
                    let resp = self.complete(done);
                    writer.write(&resp).await.map_err(write_error)?;
                }
            }
        }

        // Let in-flight calls finish so their results are not lost.
        drop(done_tx);
        if !self.in_flight.is_empty() {
            debug!(pending = self.in_flight.len(), "Waiting for in-flight calls");
        }
        while let Some(done) = done_rx.recv().await {
            let resp = self.complete(done);
            writer.write(&resp).await.map_err(write_error)?;
        }

        if let Err(e) = reader_task.await {
            warn!(error = %e, "Reader task ended abnormally");
        }

        info!("MCP server stopped");
        Ok(())
    }

    fn handle_message(&mut self, msg: Incoming, done: &Completions) -> Option<JsonRpcResponse> {
        match msg {
            Incoming::Request(req) => self.handle_request(req, done),
            Incoming::Notification(notif) => {
                self.handle_notification(notif);
                None
            }
            Incoming::Invalid(reason) => {
                warn!(reason = %reason, "Invalid frame");
                Some(JsonRpcResponse::error(
                    RequestId::Null,
                    JsonRpcError::parse_error(&reason),
                ))
            }
        }
    }

    /// Returns `None` when the response will arrive later on `done`.
    fn handle_request(&mut self, req: JsonRpcRequest, done: &Completions) -> Option<JsonRpcResponse> {
        debug!(method = %req.method, id = %req.id, "Handling request");

        match req.method.as_str() {
            "initialize" => Some(self.handle_initialize(req.id, req.params)),
            "tools/list" => Some(self.handle_tools_list(req.id)),
            "tools/call" => self.spawn_tool_call(req.id, req.params, done),
            "ping" => Some(JsonRpcResponse::success(req.id, Value::Object(Default::default()))),
            method => {
                warn!(method = %method, "Unknown method");
                Some(JsonRpcResponse::error(
                    req.id,
                    JsonRpcError::method_not_found(method),
                ))
            }
        }
    }

    fn handle_notification(&mut self, notif: JsonRpcNotification) {
        match notif.method.as_str() {
            "initialized" | "notifications/initialized" => info!("Client initialized"),
            "notifications/cancelled" => {
                let params = notif
                    .params
                    .map(serde_json::from_value::<CancelledParams>);
                match params {
                    Some(Ok(params)) => self.cancel(&params.request_id, params.reason.as_deref()),
                    Some(Err(e)) => warn!(error = %e, "Malformed cancellation"),
                    None => warn!("Cancellation without params"),
                }
            }
            method => debug!(method = %method, "Ignoring notification"),
        }
    }

    /// Forget the finished call, unless its id already belongs to a newer one.
    fn complete(&mut self, done: Completion) -> JsonRpcResponse {
        let id = &done.response.id;
        if self.in_flight.get(id).is_some_and(|e| e.token == done.token) {
            self.in_flight.remove(id);
        }
        done.response
    }

    fn cancel(&mut self, id: &RequestId, reason: Option<&str>) {
        match self.in_flight.remove(id) {
            Some(entry) => {
                info!(id = %id, reason = reason.unwrap_or("none"), "Cancelling tool call");
                // The call may have finished in the meantime.
                let _ = entry.cancel.send(());
            }
            None => debug!(id = %id, "Cancellation for unknown or finished request"),
        }
    }

    fn handle_initialize(&mut self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        if self.initialized {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("Server already initialized"),
            );
        }

        if let Some(params) = params {
            match serde_json::from_value::<InitializeParams>(params) {
                Ok(init) => info!(
                    client = %init.client_info.name,
                    version = %init.client_info.version,
                    protocol = %init.protocol_version,
                    "Client connected"
                ),
                Err(e) => warn!(error = %e, "Failed to parse initialize params"),
            }
        }

        self.initialized = true;

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        JsonRpcResponse::from_result(id, &result)
    }

    fn handle_tools_list(&self, id: RequestId) -> JsonRpcResponse {
        let tools = self
            .registry
            .list()
            .into_iter()
            .map(ToolDefinition::from)
            .collect();

        JsonRpcResponse::from_result(id, &ToolsListResult { tools })
    }

    fn spawn_tool_call(
        &mut self,
        id: RequestId,
        params: Option<Value>,
        done: &Completions,
    ) -> Option<JsonRpcResponse> {
        let Some(params) = params else {
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params("Missing tool call params"),
            ));
        };
        let params: ToolCallParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params(&e.to_string()),
                ))
            }
        };
        if self.in_flight.contains_key(&id) {
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("Request id already in flight"),
            ));
        }

        debug!(id = %id, tool = %params.name, "Dispatching tool call");

        // Absent arguments validate as an empty object.
        let call = CallEnvelope::new(params.name, params.arguments.unwrap_or(Value::Null));
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let token = self.next_token;
        self.next_token += 1;
        self.in_flight.insert(
            id.clone(),
            InFlight {
                token,
                cancel: cancel_tx,
            },
        );

        let registry = self.registry.clone();
        let done = done.clone();
        tokio::spawn(async move {
            let name = call.name.clone();
            let cancelled = async move {
                // A dropped sender means nobody can cancel any more.
                if cancel_rx.await.is_err() {
                    std::future::pending::<()>().await;
                }
            };
            let task =
                tokio::spawn(async move { registry.dispatch_until(call, cancelled).await });

            let envelope = match task.await {
                Ok(envelope) => envelope,
                Err(e) => {
                    error!(operation = %name, error = %e, "Tool call task failed");
                    ResponseEnvelope::failure(
                        format!("Operation {} failed: {}", name, e),
                        codes::HANDLER_ERROR,
                    )
                }
            };

            let result = ToolCallResult::from_envelope(&envelope);
            // The server loop is gone only if writing already failed.
            let _ = done.send(Completion {
                token,
                response: JsonRpcResponse::from_result(id, &result),
            });
        });

        None
    }
}

async fn read_loop<R>(mut reader: LineReader<R>, tx: mpsc::Sender<Incoming>)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let msg = match reader.next_message().await {
            Ok(Some(msg)) => msg,
            Ok(None) => break,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => Incoming::Invalid(e.to_string()),
            Err(e) => {
                error!(error = %e, "Transport read failed");
                break;
            }
        };
        if tx.send(msg).await.is_err() {
            break;
        }
    }
}

fn write_error(e: io::Error) -> Error {
    error!(error = %e, "Failed to write response");
    Error::Other(e.into())
}
