//! MCP Server
//!
//! Dispatches JSON-RPC requests from the client to the tool catalog and the
//! invocation gateway.
//!
//! # Lifecycle
//!
//! 1. The client sends `initialize`, then `notifications/initialized`
//! 2. `tools/list` returns the catalog
//! 3. Each `tools/call` runs in its own task; responses may arrive out of order
//! 4. At end of input, in-flight calls finish and their responses are flushed

use crate::gateway::Invoker;
use crate::mcp::protocol::{
    tool_call_result, InitializeParams, InitializeResult, McpError, McpMethod, McpRequest,
    McpResponse, ServerInfo, ToolCallParams, DEFAULT_PROTOCOL_VERSION,
};
use crate::mcp::tools::ToolRegistry;
use crate::mcp::transport::{self, Incoming, MessageReader, MessageWriter};
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "safe-ai-util-mcp";

/// MCP server over the tool catalog
#[derive(Clone)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    invoker: Arc<dyn Invoker>,
}

impl McpServer {
    /// Create a server with the built-in catalog
    pub fn new(invoker: Arc<dyn Invoker>) -> Self {
        Self::with_registry(ToolRegistry::new(), invoker)
    }

    pub fn with_registry(registry: ToolRegistry, invoker: Arc<dyn Invoker>) -> Self {
        Self {
            registry: Arc::new(registry),
            invoker,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Serve on the process's stdin/stdout until the client closes input
    pub async fn serve_stdio(&self) -> Result<()> {
        let (reader, writer) = transport::stdio();
        self.serve(reader, writer).await
    }

    /// Serve until the reader reaches end of stream
    ///
    /// Tool calls already started are always awaited and their responses
    /// flushed, even when reading from the client fails.
    pub async fn serve<R, W>(
        &self,
        mut reader: MessageReader<R>,
        mut writer: MessageWriter<W>,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<McpResponse>();

        let writer_task = tokio::spawn(async move {
            while let Some(response) = rx.recv().await {
                writer.send(&response).await?;
            }
            Ok::<(), anyhow::Error>(())
        });

        let mut calls = JoinSet::new();
        let read_outcome = self.dispatch(&mut reader, &tx, &mut calls).await;
        if let Err(ref e) = read_outcome {
            warn!("Stopped reading from MCP client: {:#}", e);
        }

        debug!("Input closed, waiting for {} in-flight tool calls", calls.len());
        while calls.join_next().await.is_some() {}

        drop(tx);
        let write_outcome = writer_task
            .await
            .context("MCP response writer task panicked")?;
        read_outcome.and(write_outcome)
    }

    /// Read requests until end of stream, spawning each `tools/call`
    async fn dispatch<R>(
        &self,
        reader: &mut MessageReader<R>,
        tx: &mpsc::UnboundedSender<McpResponse>,
        calls: &mut JoinSet<()>,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        while let Some(incoming) = reader.recv().await? {
            // Reap finished calls so the set does not grow unbounded
            while calls.try_join_next().is_some() {}

            let request = match incoming {
                Incoming::Request(request) => request,
                Incoming::Invalid(response) => {
                    let _ = tx.send(response);
                    continue;
                }
            };

            if McpMethod::from(request.method.as_str()) == McpMethod::ToolsCall {
                let server = self.clone();
                let tx = tx.clone();
                calls.spawn(async move {
                    if let Some(response) = server.handle(request).await {
                        let _ = tx.send(response);
                    }
                });
            } else if let Some(response) = self.handle(request).await {
                let _ = tx.send(response);
            }
        }
        Ok(())
    }

    /// Handle one request; `None` for notifications
    pub async fn handle(&self, request: McpRequest) -> Option<McpResponse> {
        let method = McpMethod::from(request.method.as_str());

        if request.is_notification() {
            debug!("Notification: {}", method.as_str());
            return None;
        }

        let outcome = match method {
            McpMethod::Initialize => self.initialize(request.params),
            McpMethod::Initialized | McpMethod::Ping => Ok(json!({})),
            McpMethod::ToolsList => Ok(json!({ "tools": self.registry.definitions() })),
            McpMethod::ToolsCall => self.call_tool(request.params).await,
            McpMethod::Custom(ref name) => {
                debug!("Unknown method: {}", name);
                Err(McpError::method_not_found(name.as_str()))
            }
        };

        Some(match outcome {
            Ok(result) => McpResponse::ok(request.id, result),
            Err(error) => McpResponse::err(request.id, error),
        })
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: InitializeParams = match params {
            Some(params) => serde_json::from_value(params).map_err(|e| {
                McpError::invalid_params(format!("Invalid initialize params: {}", e))
            })?,
            None => InitializeParams::default(),
        };

        if let Some(ref client) = params.client_info {
            info!("Client connected: {} {}", client.name, client.version);
        }

        let result = InitializeResult {
            protocol_version: params
                .protocol_version
                .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_string()),
            capabilities: json!({ "tools": { "listChanged": false } }),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        serde_json::to_value(result).map_err(|e| {
            McpError::internal_error(format!("Failed to encode initialize result: {}", e))
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: ToolCallParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| McpError::invalid_params(format!("Invalid tools/call params: {}", e)))?;

        let request = self.registry.request(&params.name, &params.arguments)?;
        info!("Calling tool {}", params.name);

        match self.invoker.invoke(request).await {
            Ok(result) => Ok(tool_call_result(&result)),
            Err(e) => {
                warn!("Tool {} failed: {}", params.name, e);
                Err(McpError::from(&e))
            }
        }
    }
}
