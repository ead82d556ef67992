//! Binary Resolution
//!
//! Decides which executable the gateway hands every invocation to. Resolution
//! never fails: when nothing is found on the search path the preferred name is
//! returned anyway and the spawn reports the absence.

use std::ffi::OsString;
use tracing::debug;

/// Current name of the delegated binary
pub const PRIMARY_BINARY: &str = "safe-ai-util";

/// Name the binary shipped under before the rename
pub const LEGACY_BINARY: &str = "copilot-agent-util";

/// Resolves the delegated binary on every call
///
/// Nothing is cached, so a binary installed after startup is picked up by the
/// next invocation.
#[derive(Debug, Clone)]
pub struct BinaryResolver {
    /// Explicit identifier, returned verbatim when set
    override_binary: Option<String>,

    /// Candidate names in preference order
    candidates: Vec<String>,

    /// Search path to probe; `None` reads `PATH` at call time
    search_path: Option<OsString>,
}

impl Default for BinaryResolver {
    fn default() -> Self {
        Self::new(None)
    }
}

impl BinaryResolver {
    /// Create a resolver with the standard candidate list
    ///
    /// An empty override counts as unset.
    pub fn new(override_binary: Option<String>) -> Self {
        Self {
            override_binary: override_binary.filter(|b| !b.is_empty()),
            candidates: vec![PRIMARY_BINARY.to_string(), LEGACY_BINARY.to_string()],
            search_path: None,
        }
    }

    /// Probe an explicit search path instead of the live `PATH`
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// The configured override, if any
    pub fn override_binary(&self) -> Option<&str> {
        self.override_binary.as_deref()
    }

    /// Resolve the identifier to spawn
    ///
    /// # Example
    ///
    /// ```
    /// use safe_ai_util_mcp::gateway::BinaryResolver;
    ///
    /// let resolver = BinaryResolver::new(Some("/opt/bin/safe-ai-util".to_string()));
    /// assert_eq!(resolver.resolve(), "/opt/bin/safe-ai-util");
    /// ```
    pub fn resolve(&self) -> String {
        if let Some(ref binary) = self.override_binary {
            debug!("Using binary override: {}", binary);
            return binary.clone();
        }

        for candidate in &self.candidates {
            if self.is_executable(candidate) {
                debug!("Resolved binary on search path: {}", candidate);
                return candidate.clone();
            }
        }

        debug!(
            "No candidate found on search path, defaulting to {}",
            PRIMARY_BINARY
        );
        PRIMARY_BINARY.to_string()
    }

    fn is_executable(&self, name: &str) -> bool {
        match self.search_path {
            Some(ref paths) => {
                let cwd = std::env::current_dir().unwrap_or_default();
                which::which_in(name, Some(paths), cwd).is_ok()
            }
            None => which::which(name).is_ok(),
        }
    }
}
