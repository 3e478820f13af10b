//! sentitrade - headless retrain / decide / trade loop for one ticker.
//!
//! # Usage
//! ```sh
//! TICKER=AAPL cargo run                      # mock data, mock brokerage
//! TICKER=AAPL cargo run -- --once            # single cycle, then exit
//! cargo run -- --config sentitrade.toml      # file values, env overrides
//! ```
//!
//! Alpaca mode reads `ALPACA_API_KEY` / `ALPACA_SECRET_KEY` from the environment
//! or a local `.env`.

use anyhow::Result;
use clap::Parser;
use sentitrade::application::system::Application;
use sentitrade::config::Config;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Sentiment-aware retrain and trade loop", long_about = None)]
struct Cli {
    /// Optional TOML file; environment variables take precedence over its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let cli = Cli::parse();

    info!("sentitrade {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::load(cli.config.as_deref())?;
    info!(
        "Configuration loaded: Mode={:?}, Engine={:?}, Ticker={}, Trials={}",
        config.mode, config.engine, config.trading.ticker, config.search.trial_budget
    );

    let app = Application::build(config)?;
    let shutdown = CancellationToken::new();
    let scheduler = app.scheduler(shutdown.clone());

    if cli.once {
        scheduler.run_once().await?;
        return Ok(());
    }

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, stopping after the current cycle...");
            signal_token.cancel();
        }
    });

    let report = scheduler.run().await;
    info!(
        "Exiting: {} cycles completed, {} failed",
        report.completed, report.failed
    );
    Ok(())
}
