//! Peer monitor binary.
//!
//! Serves the monitor API and dashboard until Ctrl-C.

use peer_monitor::{MonitorConfig, logging, run_server};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = MonitorConfig::from_env();
    logging::init(&config.log_level)?;

    info!("Starting peer monitor on {}...", config.bind_addr);

    run_server(&config, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
        }
    })
    .await
}
