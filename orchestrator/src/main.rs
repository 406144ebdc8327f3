//! SOP orchestrator CLI
//!
//! Usage:
//!   sop-orchestrator serve --port 8080 --engine-url http://localhost:8000
//!   sop-orchestrator interpret tool-result.json
//!   sop-orchestrator outline procedure.txt

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sop_orchestrator::config::OrchestratorConfig;
use sop_orchestrator::interpreter::ResultInterpreter;
use sop_orchestrator::procedure;
use sop_orchestrator::web::{self, state::AppState, WebConfig};

#[derive(Parser)]
#[command(name = "sop-orchestrator")]
#[command(about = "Human-in-the-loop execution of standard operating procedures")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: search for .sop.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Listen address
        #[arg(long)]
        host: Option<String>,

        /// Listen port
        #[arg(short, long, env = "SOP_PORT")]
        port: Option<u16>,

        /// Tool-execution engine base URL
        #[arg(long, env = "SOP_ENGINE_URL")]
        engine_url: Option<String>,

        /// Artifact server base URL for annotated images
        #[arg(long, env = "SOP_ARTIFACT_BASE_URL")]
        artifact_base_url: Option<String>,
    },
    /// Normalize a raw tool payload and print it as JSON
    Interpret {
        /// Payload file, or `-` for stdin
        input: String,

        /// Artifact server base URL for annotated images
        #[arg(long, env = "SOP_ARTIFACT_BASE_URL")]
        artifact_base_url: Option<String>,
    },
    /// Print the numbered steps of a procedure
    Outline {
        /// Procedure file, or `-` for stdin
        input: String,
    },
}

/// Initialize tracing with the given verbosity level
///
/// - 0: warn (default)
/// - 1: info (-v)
/// - 2: debug (-vv)
/// - 3+: trace (-vvv)
fn init_tracing(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    // Allow RUST_LOG to override if set
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    tracing_subscriber::registry()
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI first to get verbosity before initializing tracing
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    let mut config = match &cli.config {
        Some(path) => OrchestratorConfig::load_from_path(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => OrchestratorConfig::load().context("failed to load config")?,
    };

    match cli.command {
        Commands::Serve {
            host,
            port,
            engine_url,
            artifact_base_url,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(url) = engine_url {
                config.engine.url = url;
            }
            if let Some(url) = artifact_base_url {
                config.artifacts.base_url = url;
            }
            config.validate()?;

            tracing::info!(
                engine = %config.engine.url,
                artifacts = %config.artifacts.base_url,
                "Using tool-execution engine"
            );

            let state = AppState::from_config(&config);
            web::serve(
                WebConfig {
                    host: config.server.host.clone(),
                    port: config.server.port,
                },
                state,
            )
            .await
        }

        Commands::Interpret {
            input,
            artifact_base_url,
        } => {
            let base = artifact_base_url.unwrap_or(config.artifacts.base_url);
            let raw = read_input(&input)?;

            let result = ResultInterpreter::new(base).interpret(Some(&raw));
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }

        Commands::Outline { input } => {
            let text = read_input(&input)?;
            let steps = procedure::outline(&text);

            if steps.is_empty() {
                eprintln!("No numbered steps found.");
                std::process::exit(1);
            }
            for (i, step) in steps.iter().enumerate() {
                println!("{}. {}", i + 1, step);
            }
            Ok(())
        }
    }
}

/// Read a file, or stdin when the path is `-`
fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }

    std::fs::read_to_string(input).with_context(|| format!("failed to read {}", input))
}
