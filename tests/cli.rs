use assert_cmd::Command;
use predicates::prelude::*;

const NO_CONFIG: &str = "/nonexistent/safe-ai-util-mcp/config.toml";

/// Binary under test, isolated from the caller's configuration
fn bridge() -> Command {
    let mut cmd = Command::cargo_bin("safe-ai-util-mcp").unwrap();
    cmd.args(["--config", NO_CONFIG])
        .env_remove("SAFE_AI_UTIL_BIN")
        .env_remove("SAFE_AI_UTIL_TIMEOUT")
        .env_remove("SAFE_AI_UTIL_LOG_LEVEL")
        .env_remove("SAFE_AI_UTIL_LOG_FORMAT")
        .env_remove("RUST_LOG");
    cmd
}

#[cfg(unix)]
fn write_double(dir: &std::path::Path, body: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("safe-ai-util");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("safe-ai-util-mcp").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("safe-ai-util-mcp 0.1.0"));
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("safe-ai-util-mcp").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "MCP bridge exposing safe-ai-util workflows as tools",
        ));
}

#[test]
fn test_cli_tools_lists_catalog() {
    bridge()
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"git_status\""))
        .stdout(predicate::str::contains("\"py_venv_remove\""))
        .stdout(predicate::str::contains("inputSchema"));
}

#[test]
fn test_cli_resolve_honors_override() {
    bridge()
        .arg("resolve")
        .env("SAFE_AI_UTIL_BIN", "/opt/tools/safe-ai-util")
        .assert()
        .success()
        .stdout("/opt/tools/safe-ai-util\n");
}

#[test]
fn test_cli_reports_rejected_timeout_override() {
    bridge()
        .arg("resolve")
        .env("SAFE_AI_UTIL_BIN", "/opt/tools/safe-ai-util")
        .env("SAFE_AI_UTIL_TIMEOUT", "soon")
        .assert()
        .success()
        .stdout("/opt/tools/safe-ai-util\n")
        .stderr(predicate::str::contains(
            r#"Ignoring invalid SAFE_AI_UTIL_TIMEOUT="soon", keeping 900s"#,
        ));
}

#[test]
fn test_cli_exec_requires_arguments() {
    bridge()
        .arg("exec")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "required arguments were not provided",
        ));
}

#[test]
fn test_cli_exec_rejects_malformed_env() {
    bridge()
        .args(["exec", "--env", "NOEQUALS", "--", "git", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected KEY=VALUE"));
}

#[test]
fn test_cli_exec_missing_binary() {
    bridge()
        .args(["exec", "--", "git", "status"])
        .env("SAFE_AI_UTIL_BIN", "/definitely/not/here/safe-ai-util")
        .assert()
        .code(127)
        .stderr(predicate::str::contains("/definitely/not/here/safe-ai-util"));
}

#[cfg(unix)]
#[test]
fn test_cli_exec_mirrors_exit_code() {
    let dir = tempfile::TempDir::new().unwrap();
    let double = write_double(dir.path(), r#"printf '%s ' "$@"; echo "$EXTRA" >&2; exit 3"#);

    bridge()
        .args(["exec", "--env", "EXTRA=yes", "--", "buf", "lint"])
        .env("SAFE_AI_UTIL_BIN", &double)
        .assert()
        .code(3)
        .stdout(predicate::str::contains(
            r#"{"code":3,"stdout":"buf lint ","stderr":"yes\n"}"#,
        ));
}

#[cfg(unix)]
#[test]
fn test_cli_exec_timeout() {
    let dir = tempfile::TempDir::new().unwrap();
    let double = write_double(dir.path(), "sleep 5");

    bridge()
        .args(["exec", "--timeout", "1", "--", "python", "run", "pytest"])
        .env("SAFE_AI_UTIL_BIN", &double)
        .assert()
        .code(124)
        .stderr(predicate::str::contains("timed out"));
}

#[cfg(unix)]
#[test]
fn test_cli_serve_over_stdio() {
    let dir = tempfile::TempDir::new().unwrap();
    let double = write_double(dir.path(), "printf clean");

    let input = [
        serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
            "params": {"protocolVersion": "2025-03-26"}}),
        serde_json::json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        serde_json::json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
            "params": {"name": "git_status", "arguments": {}}}),
    ]
    .iter()
    .map(|m| format!("{}\n", m))
    .collect::<String>();

    let output = bridge()
        .arg("serve")
        .env("SAFE_AI_UTIL_BIN", &double)
        .write_stdin(input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    // stdout carries protocol messages only
    let lines: Vec<serde_json::Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["result"]["serverInfo"]["name"], "safe-ai-util-mcp");
    assert_eq!(
        lines[1]["result"]["structuredContent"],
        serde_json::json!({"code": 0, "stdout": "clean", "stderr": ""})
    );
}
