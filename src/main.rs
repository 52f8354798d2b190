//! Wonder Words - server binary.

#![warn(missing_docs)]

mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command, ServeArgs};
use tracing::{info, instrument, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wonder_words::{ServerConfig, SessionEngine, WordBank, serve};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    initialize_tracing();

    match cli.command {
        Command::Serve(args) => run_server(args).await,
        Command::Words { words } => check_words(&words),
    }
}

/// Run the websocket game server
#[instrument(skip_all, fields(config_path = %args.config.display()))]
async fn run_server(args: ServeArgs) -> Result<()> {
    let config = args.apply(ServerConfig::load_or_default(&args.config)?)?;
    info!(?config, "Starting Wonder Words server");

    let bank = Arc::new(WordBank::load(config.words())?);
    let session = SessionEngine::spawn(bank, config.game().clone())?;

    let listener = tokio::net::TcpListener::bind((config.host().as_str(), *config.port())).await?;
    info!(
        "Server ready at ws://{}:{}/ws",
        config.host(),
        config.port()
    );

    serve(listener, session.clone(), shutdown_signal()).await?;

    if let Err(e) = session.shutdown().await {
        warn!(error = %e, "Engine already stopped");
    }
    info!("Server stopped");
    Ok(())
}

/// Load a catalog and report what it holds
fn check_words(path: &Path) -> Result<()> {
    let bank = WordBank::load(path)?;
    if bank.is_empty() {
        anyhow::bail!("{} holds no words", path.display());
    }
    println!("{}: {} words", path.display(), bank.len());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

fn initialize_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wonder_words=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
