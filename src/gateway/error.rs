//! Gateway error types

use std::time::Duration;

/// Failures that prevent an invocation from producing an `ExecutionResult`
///
/// A non-zero exit code is not one of these; it is reported inside the result.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Failed to launch '{binary}': {source}")]
    Launch {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{binary}' timed out after {}s and was terminated", timeout.as_secs_f64())]
    Timeout { binary: String, timeout: Duration },

    #[error("Failed while supervising '{binary}': {source}")]
    Wait {
        binary: String,
        #[source]
        source: std::io::Error,
    },
}

impl GatewayError {
    /// Short machine-readable name for the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Launch { .. } => "launch",
            Self::Timeout { .. } => "timeout",
            Self::Wait { .. } => "wait",
        }
    }

    /// The binary identifier the failing invocation used
    pub fn binary(&self) -> &str {
        match self {
            Self::Launch { binary, .. }
            | Self::Timeout { binary, .. }
            | Self::Wait { binary, .. } => binary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let launch = GatewayError::Launch {
            binary: "safe-ai-util".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(launch.kind(), "launch");
        assert_eq!(launch.binary(), "safe-ai-util");
        assert!(launch.to_string().contains("Failed to launch"));

        let timeout = GatewayError::Timeout {
            binary: "safe-ai-util".to_string(),
            timeout: Duration::from_secs(2),
        };
        assert_eq!(timeout.kind(), "timeout");
        assert!(timeout.to_string().contains("timed out after 2s"));
    }
}
