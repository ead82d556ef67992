//! safe-ai-util MCP Bridge Library
//!
//! Exposes developer-workflow operations (git, buf, Python environments) as
//! MCP tools and runs each one by delegating to the `safe-ai-util` binary
//! through a sandboxed subprocess gateway.

pub mod config;
pub mod gateway;
pub mod logging;
pub mod mcp;
