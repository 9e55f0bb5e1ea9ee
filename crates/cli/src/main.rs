//! Solace CLI: the main entry point.
//!
//! Commands:
//! - `redact`: Classify and mask sensitive content
//! - `analyze`: Mood patterns, timeline and insight summary from a JSON export
//! - `context`: Assemble a model context from a JSON fixture
//! - `replay`: Run agent commands through the command queue
//! - `cleanup`: Decay/expiry cycles on the configured store
//! - `config`: Show the effective configuration

use anyhow::Context;
use clap::{Parser, Subcommand};
use solace_config::AppConfig;
use solace_privacy::ContentCategory;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "solace",
    about = "Solace: privacy-aware, mood-adaptive context assembly",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Read configuration from this file instead of ~/.solace/config.toml
    #[arg(long, global = true, env = "SOLACE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify text and mask sensitive spans
    Redact {
        text: String,

        /// Categories the user has allowed (personal, trauma, health, identity, conflict)
        #[arg(long, value_delimiter = ',')]
        allow: Vec<ContentCategory>,
    },

    /// Analyze a `{ moods, journal, goals }` JSON export
    Analyze { file: PathBuf },

    /// Build a context from a JSON fixture of memories, messages and profile
    Context { file: PathBuf },

    /// Replay a JSON array of agent commands and print the coordination board
    Replay { file: PathBuf },

    /// Run one cleanup cycle on the configured memory store
    Cleanup {
        /// Keep running, one cycle every `memory.cleanup_interval_minutes`, until Ctrl-C
        #[arg(long)]
        watch: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("Failed to load config")?;

    init_tracing(cli.verbose, config.logging.json);

    match cli.command {
        Commands::Redact { text, allow } => commands::redact::run(&config, &text, &allow)?,
        Commands::Analyze { file } => commands::analyze::run(&file)?,
        Commands::Context { file } => commands::context::run(&config, &file).await?,
        Commands::Replay { file } => commands::replay::run(&file).await?,
        Commands::Cleanup { watch } => commands::cleanup::run(&config, watch).await?,
        Commands::Config => commands::config_cmd::show(&config)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
