//! Invocation deadlines
//!
//! Every invocation of the delegated binary is bounded. The process-wide
//! default is read once from configuration when the gateway is built; a
//! request may override it for a single call.

use std::time::Duration;

/// Default bound for one invocation, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 900;

/// Process-wide default deadline for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionTimeout {
    /// The process-wide default duration
    duration: Duration,
}

impl Default for ExecutionTimeout {
    fn default() -> Self {
        Self::from_secs(DEFAULT_TIMEOUT_SECS)
    }
}

impl ExecutionTimeout {
    /// Wrap an explicit duration
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use safe_ai_util_mcp::gateway::ExecutionTimeout;
    ///
    /// let timeout = ExecutionTimeout::new(Duration::from_secs(30));
    /// assert_eq!(timeout.duration(), Duration::from_secs(30));
    /// ```
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Create a timeout from seconds
    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Get the default duration
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Pick the bound for one call
    ///
    /// An explicit, non-zero request value wins; a missing or zero value falls
    /// back to the default.
    pub fn effective(&self, requested: Option<Duration>) -> Duration {
        match requested {
            Some(d) if !d.is_zero() => d,
            _ => self.duration,
        }
    }
}
