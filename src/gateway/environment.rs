//! Sanitized child environment
//!
//! The delegated binary never sees the bridge's full environment. Only `PATH`
//! and a short allow-list of shell-related variables are carried over, then the
//! request's own variables are layered on top.

use std::collections::BTreeMap;

/// Variables copied from the ambient environment when present
pub const ALLOWED_VARS: [&str; 5] = ["HOME", "SHELL", "TERM", "LANG", "LC_ALL"];

/// Environment handed to exactly one child process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedEnvironment {
    vars: BTreeMap<String, String>,
}

impl SanitizedEnvironment {
    /// Build the environment from an explicit ambient snapshot
    ///
    /// `PATH` is always present (empty when the ambient environment lacks it).
    /// `extra` is merged last and overrides anything inherited.
    pub fn build<I, K, V>(ambient: I, extra: &BTreeMap<String, String>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let ambient: BTreeMap<String, String> = ambient
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut vars = BTreeMap::new();
        vars.insert(
            "PATH".to_string(),
            ambient.get("PATH").cloned().unwrap_or_default(),
        );

        for key in ALLOWED_VARS {
            if let Some(value) = ambient.get(key) {
                vars.insert(key.to_string(), value.clone());
            }
        }

        for (key, value) in extra {
            vars.insert(key.clone(), value.clone());
        }

        Self { vars }
    }

    /// Build the environment from the live process environment
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    pub fn from_process(extra: &BTreeMap<String, String>) -> Self {
        Self::build(std::env::vars_os().filter_map(|(k, v)| {
            Some((k.into_string().ok()?, v.into_string().ok()?))
        }), extra)
    }

    /// Look up one variable
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether no variables are set (never true for a built environment)
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over name/value pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
