use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::FlowConfig;
use crate::engine::{Engine, Outcome};
use crate::entity::JsonObject;
use crate::extensions::Extensions;
use crate::program::Program;

#[derive(Parser)]
#[command(name = "flow")]
#[command(about = "Flow - an embedded workflow automation language", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that a script parses
    Check {
        /// Script to check
        file: PathBuf,
    },

    /// Print the syntax tree of a script as JSON
    Ast {
        /// Script to parse
        file: PathBuf,
    },

    /// Run a script against a stub host that echoes every request back
    Run {
        /// Script to run
        file: PathBuf,

        /// Instance id bound to `instance_id` in the script
        #[arg(long, default_value = "1")]
        id: i64,

        /// Iteration cap for `repeat` blocks
        #[arg(long)]
        max_loop_count: Option<u64>,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Check { file } => {
            let program = load(&file)?;
            if !program.valid() {
                bail!("{}", program.error_message());
            }
            println!("✓ {} is valid", file.display());
        }

        Commands::Ast { file } => {
            let program = load(&file)?;
            if !program.valid() {
                bail!("{}", program.error_message());
            }
            let json = serde_json::to_string_pretty(program.ast())
                .context("Failed to serialize syntax tree")?;
            println!("{}", json);
        }

        Commands::Run {
            file,
            id,
            max_loop_count,
        } => {
            let config = FlowConfig::builder()
                .config_path(cli.config)
                .max_loop_count(max_loop_count)
                .build()?;
            let code = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let file_name = file.display().to_string();

            let delay = Duration::from_millis(config.host.reply_delay_ms);
            let engine = Engine::new(config).with_extensions(stub_host(delay));

            let local = tokio::task::LocalSet::new();
            let outcome = local
                .run_until(async move { engine.spawn(code, file_name, id).await })
                .await
                .context("Instance task failed")?;

            match outcome {
                Outcome::Completed(Some(value)) => println!("Result: {}", value),
                Outcome::Completed(None) => println!("Completed"),
                other => {
                    other.into_result()?;
                }
            }
        }

        Commands::Config => {
            let config = FlowConfig::builder().config_path(cli.config).build()?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn load(file: &Path) -> Result<Program> {
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    Ok(Program::parse(code, file.display().to_string()))
}

/* ===================== Stub Host ===================== */

async fn echo(delegate: &'static str, delay: Duration, request: JsonObject) -> Result<JsonObject> {
    info!(
        delegate,
        request = %serde_json::Value::Object(request.clone()),
        "stub host request"
    );
    tokio::time::sleep(delay).await;
    Ok(request)
}

fn stub_host(delay: Duration) -> Extensions {
    Extensions::new()
        .with_action(move |request| echo("action", delay, request))
        .with_campaign(move |request| echo("campaign", delay, request))
        .with_device_info(move |request| echo("device_info", delay, request))
        .with_http(move |request| echo("http", delay, request))
}
