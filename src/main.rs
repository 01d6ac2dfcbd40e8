use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};

use notifeed::config::Config;
use notifeed::envelope;
use notifeed::poller::{Poller, Watermarks};

/// Per-request timeout for feed fetches and event deliveries.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(
    name = "notifeed",
    version,
    about = "Fetch feeds and notify new entries as CloudEvents"
)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let interval = config.interval().context("Invalid poll interval")?;

    let client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(envelope::USER_AGENT)
        .build()
        .context("Failed to build HTTP client")?;

    let poller = Poller::new(client, Arc::new(config), Arc::new(Watermarks::new()));

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    // First tick fires immediately, then once per interval. Each cycle runs
    // detached, so a slow cycle never delays the next tick — overlapping
    // cycles are permitted rather than queued or skipped.
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("SIGTERM received, shutting down");
                break;
            }
            _ = &mut ctrl_c => {
                tracing::info!("Interrupt received, shutting down");
                break;
            }
            _ = ticker.tick() => {
                let poller = poller.clone();
                tokio::spawn(async move {
                    poller.run_cycle().await;
                });
            }
        }
    }

    // The scheduler exits between ticks; an in-flight cycle is not awaited
    // and the process exits underneath it.
    Ok(())
}
