//! reelcheck CLI - Main Entry Point
//!
//! Runs conformance scenarios against a movie site, probes its
//! availability and drives a ramping load profile.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

use commands::{list, load, probe, run};
use reelcheck_common::HarnessConfig;

/// reelcheck - black-box checks for server-rendered movie sites
#[derive(Parser)]
#[command(name = "reelcheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// TOML config file (also REELCHECK_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the site under test (overrides BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios against the target
    Run(run::RunArgs),

    /// List available scenarios
    List(list::ListArgs),

    /// Check whether the target responds
    Probe,

    /// Run a ramping load profile against one endpoint
    Load(load::LoadArgs),
}

impl Cli {
    fn harness_config(&self) -> anyhow::Result<HarnessConfig> {
        let mut config = HarnessConfig::load(self.config.as_deref())?;
        if let Some(base_url) = &self.base_url {
            config.target.base_url = base_url.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.harness_config()?;
    tracing::debug!("Target: {}, driver: {}", config.target.base_url, config.driver.kind);

    let ok = match cli.command {
        Commands::Run(args) => run::execute(args, config, cli.format).await?,
        Commands::List(args) => list::execute(args, &config, cli.format)?,
        Commands::Probe => probe::execute(&config, cli.format).await?,
        Commands::Load(args) => load::execute(args, config, cli.format).await?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
