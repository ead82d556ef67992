// safe-ai-util MCP Bridge - Main Entry Point
//
// Serves the safe-ai-util tool catalog over MCP stdio, or runs single
// gateway operations from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use safe_ai_util_mcp::config::Config;
use safe_ai_util_mcp::gateway::{ExecutionRequest, Gateway, GatewayError};
use safe_ai_util_mcp::logging;
use safe_ai_util_mcp::mcp::{McpServer, ToolRegistry};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// safe-ai-util MCP bridge
#[derive(Parser, Debug)]
#[command(name = "safe-ai-util-mcp")]
#[command(version)]
#[command(about = "MCP bridge exposing safe-ai-util workflows as tools", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a TOML config file (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the tool catalog over MCP stdio (default)
    Serve,
    /// Print the tool catalog as JSON
    Tools,
    /// Print the binary identifier tool calls would use
    Resolve,
    /// Run one gateway invocation and print its result as JSON
    Exec {
        /// Timeout in seconds (default: configured timeout)
        #[arg(long)]
        timeout: Option<u64>,

        /// Working directory for the delegated binary
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Extra environment variable for the child (repeatable)
        #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
        env: Vec<(String, String)>,

        /// Arguments for the delegated binary
        #[arg(required = true, last = true)]
        args: Vec<String>,
    },
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = match args.config {
        Some(ref path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    logging::init(&config.logging, args.verbose)?;
    for message in &config.ignored_overrides {
        warn!("{}", message);
    }

    let gateway = Gateway::from_config(&config.gateway);

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            serve(gateway).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Tools => {
            let tools = ToolRegistry::new().definitions();
            println!("{}", serde_json::to_string_pretty(&tools)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Resolve => {
            println!("{}", gateway.resolver().resolve());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Exec {
            timeout,
            cwd,
            env,
            args,
        } => exec(gateway, args, timeout, cwd, env).await,
    }
}

async fn serve(gateway: Gateway) -> Result<()> {
    // Resolution never fails; this only reports what calls will use
    info!(
        "safe-ai-util-mcp v{} starting, delegating to {} (timeout {:?})",
        env!("CARGO_PKG_VERSION"),
        gateway.resolver().resolve(),
        gateway.timeout().duration()
    );

    let server = McpServer::new(Arc::new(gateway));
    server.serve_stdio().await?;

    info!("Client disconnected, shutting down");
    Ok(())
}

async fn exec(
    gateway: Gateway,
    args: Vec<String>,
    timeout: Option<u64>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
) -> Result<ExitCode> {
    let mut request = ExecutionRequest::new(args);
    if let Some(secs) = timeout {
        request = request.with_timeout(Duration::from_secs(secs));
    }
    if let Some(dir) = cwd {
        request = request.with_working_dir(dir);
    }
    for (key, value) in env {
        request = request.with_env(key, value);
    }

    match gateway.invoke(&request).await {
        Ok(result) => {
            println!("{}", serde_json::to_string(&result)?);
            // Signalled children report -N; mirror the shell's 128+N
            let code = if result.code < 0 { 128 - result.code } else { result.code };
            Ok(ExitCode::from(code.clamp(0, 255) as u8))
        }
        Err(e @ GatewayError::Timeout { .. }) => {
            eprintln!("Error: {}", e);
            Ok(ExitCode::from(124))
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Ok(ExitCode::from(127))
        }
    }
}
