//! MediaShelf - Browse media folders by the tags in their names
//!
//! Command-line entry point.

mod app;
mod cli;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging and panic hook first
    app_log::init()?;

    // Clean up old logs (7 days)
    if let Err(e) = app_log::cleanup_old_logs(7) {
        tracing::warn!("Failed to cleanup old logs: {}", e);
    }

    tracing::info!("MediaShelf starting...");

    // Load configuration
    let config = app_core::AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Invalid configuration, using defaults: {}", e);
        app_core::AppConfig::default()
    });

    let pool = app_db::init()?;
    let services = app::Services { config, pool };

    let mut stdout = std::io::stdout().lock();
    app::run(cli, &services, &mut stdout).await
}
