//! MCP Transport Layer
//!
//! Line-delimited JSON-RPC over a byte stream: one message per line in, one
//! response per line out. The server uses stdin/stdout; tests use in-memory
//! pipes.
//!
//! # Architecture
//!
//! The transport is responsible only for framing and (de)serialization.
//! Reading and writing are split so responses can be written from a separate
//! task while the next request is being read.

use crate::mcp::protocol::{McpError, McpRequest, McpResponse, RequestId, JSONRPC_VERSION};
use anyhow::{Context, Result};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// One line read from the client
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// A well-formed request or notification
    Request(McpRequest),

    /// A line that was not a valid request, with the error response to send
    Invalid(McpResponse),
}

/// Reads framed messages from the client
pub struct MessageReader<R> {
    reader: BufReader<R>,

    /// Reusable buffer for one raw line
    line_buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_buffer: Vec::with_capacity(4096),
        }
    }

    /// Read the next message
    ///
    /// Blank lines are skipped. A line that is not UTF-8 becomes a parse
    /// error response rather than an I/O error. Returns `Ok(None)` at end of
    /// stream.
    pub async fn recv(&mut self) -> Result<Option<Incoming>> {
        loop {
            self.line_buffer.clear();

            let bytes_read = self
                .reader
                .read_until(b'\n', &mut self.line_buffer)
                .await
                .context("Failed to read from MCP client")?;

            if bytes_read == 0 {
                tracing::debug!("MCP client closed input (EOF)");
                return Ok(None);
            }

            let line = match std::str::from_utf8(&self.line_buffer) {
                Ok(line) => line.trim(),
                Err(e) => {
                    tracing::warn!("Discarding non-UTF-8 line from client: {}", e);
                    return Ok(Some(Incoming::Invalid(McpResponse::err(
                        None,
                        McpError::parse_error(format!("Parse error: invalid UTF-8: {}", e)),
                    ))));
                }
            };
            if line.is_empty() {
                continue;
            }

            tracing::trace!("Received from MCP client: {}", line);
            return Ok(Some(parse_line(line)));
        }
    }
}

/// Parse one line into a request, or the error response it deserves
pub fn parse_line(line: &str) -> Incoming {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Discarding malformed JSON from client: {}", e);
            return Incoming::Invalid(McpResponse::err(
                None,
                McpError::parse_error(format!("Parse error: {}", e)),
            ));
        }
    };

    // Recover the id, if any, so the error can be correlated
    let id = value
        .get("id")
        .cloned()
        .and_then(|id| serde_json::from_value::<RequestId>(id).ok());

    match serde_json::from_value::<McpRequest>(value) {
        Ok(request) if request.jsonrpc == JSONRPC_VERSION => Incoming::Request(request),
        Ok(request) => Incoming::Invalid(McpResponse::err(
            request.id,
            McpError::invalid_request(format!(
                "Unsupported jsonrpc version: {}",
                request.jsonrpc
            )),
        )),
        Err(e) => Incoming::Invalid(McpResponse::err(
            id,
            McpError::invalid_request(format!("Invalid request: {}", e)),
        )),
    }
}

/// Writes framed responses to the client
pub struct MessageWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialize a response as a single line and flush it
    pub async fn send(&mut self, response: &McpResponse) -> Result<()> {
        let json =
            serde_json::to_string(response).context("Failed to serialize MCP response to JSON")?;

        tracing::trace!("Sending to MCP client: {}", json);

        self.writer
            .write_all(json.as_bytes())
            .await
            .context("Failed to write to MCP client")?;
        self.writer
            .write_all(b"\n")
            .await
            .context("Failed to write newline to MCP client")?;
        self.writer
            .flush()
            .await
            .context("Failed to flush MCP client output")?;

        Ok(())
    }
}

/// Reader and writer over the process's stdin/stdout
pub fn stdio() -> (MessageReader<tokio::io::Stdin>, MessageWriter<tokio::io::Stdout>) {
    (
        MessageReader::new(tokio::io::stdin()),
        MessageWriter::new(tokio::io::stdout()),
    )
}
