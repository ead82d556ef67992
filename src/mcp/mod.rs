//! MCP server for the safe-ai-util tool catalog
//!
//! Hand-rolled on Tokio and Serde; no MCP SDK. Layers, bottom up:
//!
//! 1. **Protocol Layer** (`protocol`): JSON-RPC 2.0 message types
//! 2. **Transport Layer** (`transport`): line framing over stdio
//! 3. **Catalog** (`tools`): tool definitions and argument-vector templates
//! 4. **Server Layer** (`server`): request dispatch and concurrent tool calls

pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::{McpError, McpMethod, McpRequest, McpResponse, RequestId, Tool, ToolCallParams};
pub use server::{McpServer, SERVER_NAME};
pub use tools::{ToolRegistry, ToolSpec};
pub use transport::{MessageReader, MessageWriter};
