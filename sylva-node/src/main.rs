//! Sylva Node - carbon asset verification ledger and credit marketplace

mod api;
mod config;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sylva_ledger::BlockStore;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::NodeConfig;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "sylva-node")]
#[command(about = "Sylva Node - verify carbon assets and trade credits")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Configuration file to create
        #[arg(long)]
        config: Option<PathBuf>,

        /// Persist the ledger in this directory
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Start the HTTP server
    Start {
        /// Configuration file to load
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured listen address
        #[arg(long)]
        listen: Option<SocketAddr>,
    },

    /// Check a persisted chain
    VerifyChain {
        /// Directory holding the block files
        #[arg(long)]
        data_dir: PathBuf,

        /// Truncate the chain to its longest valid prefix
        #[arg(long)]
        repair: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            config,
            data_dir,
            force,
        } => init_node(config, data_dir, force),

        Commands::Start { config, listen } => start_node(config, listen).await,

        Commands::VerifyChain { data_dir, repair } => verify_chain(data_dir, repair),
    }
}

fn init_node(
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    force: bool,
) -> anyhow::Result<()> {
    let config_path = config_path.unwrap_or_else(NodeConfig::default_config_path);
    if config_path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            config_path.display()
        );
    }

    let mut config = NodeConfig::default();
    config.ledger.data_dir = Some(data_dir.unwrap_or_else(NodeConfig::default_data_dir));
    config
        .save_to_file(&config_path)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    info!("Node initialized");
    info!("Config: {}", config_path.display());
    if let Some(dir) = &config.ledger.data_dir {
        info!("Ledger data: {}", dir.display());
    }

    Ok(())
}

async fn start_node(config_path: Option<PathBuf>, listen: Option<SocketAddr>) -> anyhow::Result<()> {
    let config_path = config_path.unwrap_or_else(NodeConfig::default_config_path);
    let mut config = if config_path.exists() {
        info!("Loading config from {}", config_path.display());
        NodeConfig::load_from_file(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?
    } else {
        warn!(
            "No config at {}; using defaults with an in-memory ledger",
            config_path.display()
        );
        NodeConfig::default()
    };

    if let Some(addr) = listen {
        config.server.listen_addr = addr.to_string();
    }
    if let Err(e) = config.validate() {
        bail!("invalid configuration: {e}");
    }

    let state = AppState::open(&config)?;
    let app = api::router(state);

    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Listening on http://{}", addr);
    info!("Press Ctrl+C to stop");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }
    info!("Shutting down node...");
}

fn verify_chain(data_dir: PathBuf, repair: bool) -> anyhow::Result<()> {
    let store = BlockStore::open(&data_dir)
        .with_context(|| format!("failed to open {}", data_dir.display()))?;
    if !store.has_block(0) {
        bail!("no genesis block found in {}", data_dir.display());
    }

    let mut ledger = store.load_ledger()?;
    // chain() also fails when the load halted on an unreadable block file
    let verdict = ledger.chain().map(|_| ());
    match verdict {
        Ok(()) => {
            info!("Chain of {} block(s) is valid", ledger.len());
            Ok(())
        }
        Err(e) if repair => {
            warn!("{}", e);
            let dropped = ledger.recover()?;
            let removed = store.truncate(ledger.len())?;
            // Recovery may have replaced an invalid genesis block
            store.save_all(ledger.chain()?)?;
            info!(
                "Chain repaired: kept {} block(s), dropped {} ({} file(s) removed)",
                ledger.len(),
                dropped,
                removed
            );
            Ok(())
        }
        Err(e) => Err(e).context("chain verification failed; rerun with --repair to truncate"),
    }
}
