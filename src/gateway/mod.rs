//! Tool-Invocation Gateway
//!
//! Every tool call ends here. The gateway delegates all real work to one
//! trusted external binary and is responsible only for running it safely.
//!
//! # Security Features
//!
//! - **List Invocation**: the binary is spawned with an argument vector, never
//!   through a shell
//! - **Sanitized Environment**: only `PATH` and an allow-list of shell
//!   variables reach the child
//! - **Timeout Enforcement**: every call is bounded and the child's process
//!   group is killed when the bound is hit
//! - **No Interaction**: stdin is never connected
//!
//! # Architecture
//!
//! - `resolver.rs`: which binary to run
//! - `environment.rs`: child environment construction
//! - `timeout.rs`: default and per-call timeouts
//! - `executor.rs`: spawning, supervision and output capture
//! - `error.rs`: launch/timeout failure kinds

mod environment;
mod error;
mod executor;
mod resolver;
mod timeout;

pub use environment::{SanitizedEnvironment, ALLOWED_VARS};
pub use error::GatewayError;
pub use executor::{ExecutionRequest, ExecutionResult, Gateway};
pub use resolver::{BinaryResolver, LEGACY_BINARY, PRIMARY_BINARY};
pub use timeout::{ExecutionTimeout, DEFAULT_TIMEOUT_SECS};

use async_trait::async_trait;

/// Something that can run an [`ExecutionRequest`]
///
/// The MCP server depends on this rather than on [`Gateway`] directly so tool
/// dispatch can be tested without spawning processes.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, request: ExecutionRequest) -> Result<ExecutionResult, GatewayError>;
}

#[async_trait]
impl Invoker for Gateway {
    async fn invoke(&self, request: ExecutionRequest) -> Result<ExecutionResult, GatewayError> {
        Gateway::invoke(self, &request).await
    }
}
