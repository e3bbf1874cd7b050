//! `winbash` - emulates a POSIX shell command pipeline on Windows hosts.
//!
//! Thin binary entry point: parse CLI arguments, build a [`BashToolExecutor`],
//! and either print the tool's JSON definition or run one command to
//! completion and print its formatted response.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use winbash::{BashToolExecutor, ToolInput, WinbashConfig, get_definition};

/// Run a bash-syntax command through the Windows emulation engine.
#[derive(Debug, Parser)]
#[command(name = "winbash", version, about)]
struct Cli {
    /// The command to run, exactly as it would be written in a POSIX shell.
    #[arg(required_unless_present = "print_definition")]
    command: Option<String>,

    /// Why this command is being run, surfaced only in logs.
    #[arg(short, long, default_value = "")]
    description: String,

    /// Root directory backing the virtual Unix namespace (`claude/`,
    /// `uploads/`, `outputs/`). Defaults to the current directory.
    #[arg(long, value_name = "DIR")]
    workspace_root: Option<PathBuf>,

    /// Path to an optional `winbash.toml` layered on top of the defaults.
    #[arg(long, value_name = "FILE", default_value = "winbash.toml")]
    config: PathBuf,

    /// Print the tool's JSON definition (name, description, input schema)
    /// and exit without running anything.
    #[arg(long)]
    print_definition: bool,
}

fn main() -> std::process::ExitCode {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to build Tokio runtime: {err}");
            return std::process::ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run()) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    initialize_tracing();

    let cli = Cli::parse();

    if cli.print_definition {
        println!("{}", serde_json::to_string_pretty(&get_definition())?);
        return Ok(());
    }

    let workspace_root = match cli.workspace_root {
        Some(root) => root,
        None => std::env::current_dir().context("failed to resolve current directory")?,
    };
    let config = WinbashConfig::load(workspace_root, &cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    let executor = Arc::new(BashToolExecutor::new(config).context("failed to initialize winbash")?);

    let command = cli
        .command
        .expect("clap enforces `command` is present unless --print-definition is set");
    let response = executor
        .execute(ToolInput {
            command,
            description: cli.description,
        })
        .await;

    println!("{response}");
    Ok(())
}

fn initialize_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("WINBASH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
