//! theo - terminal front end

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use theo::{Config, Event, Services, Workflow};
use theo_shared::Mode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "theo")]
#[command(about = "Privacy-filtered research assistant", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/theo/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start mode: internal or external
    #[arg(long)]
    mode: Option<Mode>,

    /// Research model for this session
    #[arg(long)]
    research_model: Option<String>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("theo v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(mode) = cli.mode {
        config.workflow.default_mode = mode;
    }
    config.validate().context("Invalid configuration")?;

    let services = Services::from_config(&config).context("Failed to set up model client")?;
    let workflow = Workflow::new(Arc::new(services), config.workflow.clone());

    let (mut session, welcome) = workflow.start_session();
    if let Some(model) = cli.research_model {
        workflow
            .handle(&mut session, Event::SetResearchModel(model))
            .await;
    }

    theo::repl::run(&workflow, &mut session, welcome).await?;

    info!("theo shutting down");
    Ok(())
}
