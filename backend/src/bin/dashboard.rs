//! Terminal dashboard polling a running parking tracker server.
//!
//! ```bash
//! DASHBOARD_API_ORIGIN=http://localhost:8080 cargo run --bin parking-dashboard
//! ```
//!
//! `DASHBOARD_POLL_MS` sets the refresh interval (default 3000).

use std::time::Duration;

use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use parking_tracker::config::AppConfig;
use parking_tracker::dashboard::{Dashboard, DashboardClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load()?;
    let client = DashboardClient::new(config.dashboard.api_origin.clone())?;
    let interval = Duration::from_millis(config.dashboard.poll_interval_ms);
    info!(origin = client.origin(), ?interval, "Starting dashboard");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let mut dashboard = Dashboard::new(client, interval);
    dashboard
        .run(shutdown_rx, |view| {
            // Clear screen and home the cursor before each frame.
            print!("\x1b[2J\x1b[H{}", view.render());
        })
        .await;

    Ok(())
}
