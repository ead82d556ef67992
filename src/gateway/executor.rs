//! Invocation Gateway
//!
//! Runs the delegated binary once per request: resolve it, hand it a sanitized
//! environment, wait for it under a deadline, and capture both output streams.
//! A timeout kills the child's whole process group before the error is
//! returned.

use super::environment::SanitizedEnvironment;
use super::error::GatewayError;
use super::resolver::BinaryResolver;
use super::timeout::ExecutionTimeout;
use crate::config::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// One invocation of the delegated binary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Arguments after the binary name; the first is the subcommand
    pub args: Vec<String>,

    /// Per-call bound, overriding the gateway default
    pub timeout: Option<Duration>,

    /// Working directory (default: inherited)
    pub working_dir: Option<PathBuf>,

    /// Variables merged over the sanitized environment
    pub extra_env: BTreeMap<String, String>,
}

impl ExecutionRequest {
    /// Create a request from an argument vector
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.insert(key.into(), value.into());
        self
    }
}

/// Outcome of a child that ran to completion
///
/// Any exit code lands here, including non-zero ones: delegated tools use them
/// to report findings, and the caller decides what they mean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code, or the negated signal number if the child was signalled
    pub code: i32,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,
}

impl ExecutionResult {
    pub fn new(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Whether the delegate exited with code 0
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Subprocess gateway to the delegated binary
///
/// Cheap to clone and safe to share: no state is mutated between calls, so
/// independent invocations can run in parallel.
///
/// # Example
///
/// ```no_run
/// use safe_ai_util_mcp::gateway::{ExecutionRequest, Gateway};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let gateway = Gateway::default();
///     let result = gateway.invoke(&ExecutionRequest::new(["git", "status"])).await?;
///     println!("{} {}", result.code, result.stdout);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Gateway {
    resolver: BinaryResolver,
    timeout: ExecutionTimeout,

    /// Fixed ambient environment; `None` reads the process environment per call
    ambient: Option<Arc<BTreeMap<String, String>>>,
}

impl Gateway {
    pub fn new(resolver: BinaryResolver, timeout: ExecutionTimeout) -> Self {
        Self {
            resolver,
            timeout,
            ambient: None,
        }
    }

    /// Build a gateway from configuration
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            BinaryResolver::new(config.binary.clone()),
            ExecutionTimeout::from_secs(config.timeout_secs),
        )
    }

    /// Use a fixed ambient environment instead of the process environment
    pub fn with_ambient_env<I, K, V>(mut self, ambient: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.ambient = Some(Arc::new(
            ambient
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ));
        self
    }

    pub fn resolver(&self) -> &BinaryResolver {
        &self.resolver
    }

    pub fn timeout(&self) -> ExecutionTimeout {
        self.timeout
    }

    /// The environment a child would receive for these extras
    pub fn environment(&self, extra: &BTreeMap<String, String>) -> SanitizedEnvironment {
        match self.ambient {
            Some(ref ambient) => SanitizedEnvironment::build(
                ambient.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                extra,
            ),
            None => SanitizedEnvironment::from_process(extra),
        }
    }

    /// Run the delegated binary once
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Launch`] if the process cannot be started
    /// - [`GatewayError::Timeout`] if it outlives the effective timeout
    /// - [`GatewayError::Wait`] if supervising the running child fails
    pub async fn invoke(
        &self,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, GatewayError> {
        let start = Instant::now();
        let binary = self.resolver.resolve();
        let env = self.environment(&request.extra_env);
        let timeout = self.timeout.effective(request.timeout);

        let operation = request.args.first().map(String::as_str).unwrap_or("");
        debug!(
            "Invoking {} {} ({} args, timeout {:?})",
            binary,
            operation,
            request.args.len(),
            timeout
        );

        let mut command = Command::new(&binary);
        command
            .args(&request.args)
            .env_clear()
            .envs(env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = request.working_dir {
            command.current_dir(dir);
        }

        // Own process group so a timeout can take down every descendant
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| {
            warn!("Failed to launch {}: {}", binary, source);
            GatewayError::Launch {
                binary: binary.clone(),
                source,
            }
        })?;
        let pid = child.id();

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let supervised = async {
            let (status, out, err) =
                tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr));
            Ok::<_, std::io::Error>((status?, out?, err?))
        };
        let outcome = tokio::time::timeout(timeout, supervised).await;

        match outcome {
            Ok(Ok((status, out, err))) => {
                let code = exit_code(status);
                info!(
                    "{} {} exited with code {} in {:.0}ms",
                    binary,
                    operation,
                    code,
                    start.elapsed().as_secs_f64() * 1000.0
                );
                Ok(ExecutionResult {
                    code,
                    stdout: String::from_utf8_lossy(&out).into_owned(),
                    stderr: String::from_utf8_lossy(&err).into_owned(),
                })
            }
            Ok(Err(source)) => {
                terminate(&mut child, pid).await;
                warn!("Lost track of {} {}: {}", binary, operation, source);
                Err(GatewayError::Wait { binary, source })
            }
            Err(_) => {
                terminate(&mut child, pid).await;
                warn!("{} {} timed out after {:?}", binary, operation, timeout);
                Err(GatewayError::Timeout { binary, timeout })
            }
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Kill the child's process group, then kill and reap the child itself
async fn terminate(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!("killpg({}) failed: {}", pid, e);
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    // Errors here mean the child was already reaped
    if let Err(e) = child.kill().await {
        debug!("Child kill failed: {}", e);
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    -1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// Write an executable shell script standing in for the delegated binary
    fn write_double(dir: &Path, body: &str) -> String {
        let path = dir.join("double.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        path.to_string_lossy().into_owned()
    }

    fn gateway_for(binary: String) -> Gateway {
        Gateway::new(
            BinaryResolver::new(Some(binary)),
            ExecutionTimeout::from_secs(10),
        )
        .with_ambient_env([("PATH", "/usr/bin:/bin")])
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invoke_captures_streams_separately() {
        let dir = TempDir::new().unwrap();
        let binary = write_double(dir.path(), "printf out; printf err >&2; exit 3");

        let result = gateway_for(binary)
            .invoke(&ExecutionRequest::new(["git", "status"]))
            .await
            .unwrap();

        assert_eq!(result, ExecutionResult::new(3, "out", "err"));
        assert!(!result.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invoke_passes_argument_vector() {
        let dir = TempDir::new().unwrap();
        let binary = write_double(dir.path(), r#"for a in "$@"; do printf '[%s]' "$a"; done"#);

        let result = gateway_for(binary)
            .invoke(&ExecutionRequest::new(["git", "commit", "-m", "two words"]))
            .await
            .unwrap();

        assert_eq!(result.stdout, "[git][commit][-m][two words]");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invoke_working_directory() {
        let dir = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let binary = write_double(dir.path(), "pwd");

        let result = gateway_for(binary)
            .invoke(&ExecutionRequest::new(["git", "status"]).with_working_dir(work.path()))
            .await
            .unwrap();

        let expected = work.path().canonicalize().unwrap();
        assert_eq!(Path::new(result.stdout.trim()).canonicalize().unwrap(), expected);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdin_is_not_connected() {
        let dir = TempDir::new().unwrap();
        let binary = write_double(dir.path(), "cat; echo done");

        let result = gateway_for(binary)
            .invoke(&ExecutionRequest::new(["python", "pip", "install"]))
            .await
            .unwrap();

        assert_eq!(result.stdout, "done\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signalled_child_reports_negative_code() {
        let dir = TempDir::new().unwrap();
        let binary = write_double(dir.path(), "kill -TERM $$");

        let result = gateway_for(binary)
            .invoke(&ExecutionRequest::new(["git", "push"]))
            .await
            .unwrap();

        assert_eq!(result.code, -15);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_is_error() {
        let dir = TempDir::new().unwrap();
        let binary = write_double(dir.path(), "sleep 5");

        let start = Instant::now();
        let request = ExecutionRequest::new(["python", "run", "pytest"])
            .with_timeout(Duration::from_millis(300));
        let err = gateway_for(binary)
            .invoke(&request)
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_error() {
        let gateway = gateway_for("/nonexistent/safe-ai-util-12345".to_string());
        let err = gateway
            .invoke(&ExecutionRequest::new(["git", "status"]))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Launch { .. }));
        assert_eq!(err.binary(), "/nonexistent/safe-ai-util-12345");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_executable_binary_is_launch_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.txt");
        std::fs::write(&path, "echo hi").unwrap();

        let err = gateway_for(path.to_string_lossy().into_owned())
            .invoke(&ExecutionRequest::new(["git", "status"]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "launch");
    }

    #[test]
    fn test_environment_uses_injected_ambient() {
        let gateway = Gateway::default()
            .with_ambient_env([("PATH", "/bin"), ("HOME", "/root"), ("API_KEY", "x")]);

        let env = gateway.environment(&BTreeMap::new());
        assert_eq!(env.get("PATH"), Some("/bin"));
        assert_eq!(env.get("HOME"), Some("/root"));
        assert!(env.get("API_KEY").is_none());
    }

    #[test]
    fn test_from_config() {
        let config = GatewayConfig {
            binary: Some("/opt/safe-ai-util".to_string()),
            timeout_secs: 42,
        };
        let gateway = Gateway::from_config(&config);

        assert_eq!(gateway.resolver().resolve(), "/opt/safe-ai-util");
        assert_eq!(gateway.timeout().duration(), Duration::from_secs(42));
    }

    #[test]
    fn test_request_builder() {
        let request = ExecutionRequest::new(["buf", "lint"])
            .with_timeout(Duration::from_secs(5))
            .with_working_dir("/tmp")
            .with_env("BUF_TOKEN", "t");

        assert_eq!(request.args, vec!["buf", "lint"]);
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
        assert_eq!(request.working_dir, Some(PathBuf::from("/tmp")));
        assert_eq!(request.extra_env.get("BUF_TOKEN").map(String::as_str), Some("t"));
    }

    #[test]
    fn test_result_serializes_to_wire_shape() {
        let result = ExecutionResult::new(0, "clean", "");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({"code": 0, "stdout": "clean", "stderr": ""}));
    }
}
