//! Rover Dashboard entry point.

mod commands;
mod config;
mod render;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use rover_api::Client;
use rover_link::Synchronizer;

use crate::commands::Command;
use crate::config::DashboardConfig;

/// Rover Dashboard: live sensor telemetry from the rover
#[derive(Parser)]
#[command(name = "rover-dashboard")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.config/rover-dashboard/dashboard.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rover backend base URL, e.g. http://192.168.4.1:8000
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the rendered panels.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting Rover Dashboard"
    );

    let loaded = match &cli.config {
        Some(path) => DashboardConfig::load_from(path),
        None => DashboardConfig::load(),
    };
    let mut config = match loaded {
        Ok(c) => {
            tracing::info!(base_url = %c.base_url, "configuration loaded");
            c
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            DashboardConfig::default()
        }
    };
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    let client = Client::new(&config.base_url, config.request_timeout())
        .with_context(|| format!("invalid rover base URL '{}'", config.base_url))?;
    let mut sync = Synchronizer::new(client.clone(), config.sync_config())?;
    let mut changes = sync.subscribe();
    sync.start()?;

    println!("{}", commands::HELP);
    println!("{}", render::render(&sync.current(), config.stale_after()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }

            change = changes.recv() => match change {
                Ok(state) => println!("{}", render::render(&state, config.stale_after())),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "renderer fell behind");
                    println!("{}", render::render(&sync.current(), config.stale_after()));
                }
                Err(RecvError::Closed) => break,
            },

            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match Command::parse(&line) {
                    Ok(Some(cmd)) => {
                        if !run_command(cmd, &client, &sync, &config).await {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(msg) => println!("{msg}"),
                },
                Ok(None) => {
                    tracing::debug!("stdin closed, display only");
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read stdin");
                    stdin_open = false;
                }
            },
        }
    }

    sync.stop();
    tracing::info!("Rover Dashboard stopped");
    Ok(())
}

/// Executes one operator command. Returns `false` when the dashboard should exit.
async fn run_command(
    cmd: Command,
    client: &Client,
    sync: &Synchronizer,
    config: &DashboardConfig,
) -> bool {
    match cmd {
        Command::Snapshot => {
            println!("{}", commands::take_snapshot(client, &config.snapshot_dir).await);
        }
        Command::Send(command) => {
            println!("{}", commands::send_command(client, &command).await);
        }
        Command::Status => {
            println!("{}", render::render(&sync.current(), config.stale_after()));
        }
        Command::Help => println!("{}", commands::HELP),
        Command::Quit => return false,
    }
    true
}
