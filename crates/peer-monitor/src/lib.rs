//! Peer liveness and traffic monitor.
//!
//! A small HTTP service that keeps an in-memory registry of network peers,
//! accounts the traffic reported between them, samples host resources once
//! a second, and keeps a bounded activity log. An embedded dashboard polls
//! the JSON endpoints.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        warp routes                           │
//! │   GET / /health /peers /logs /stats        POST /send        │
//! └───────────────┬───────────────────────────────┬──────────────┘
//!                 │                               │
//!                 ▼                               ▼
//!      ┌─────────────────────┐        ┌──────────────────────────┐
//!      │   ResourceSampler   │        │       MonitorState       │
//!      │  lag task   (1s)    │        │  PeerRegistry            │
//!      │  cpu task   (1s)    │        │  ActivityLog (200 max)   │
//!      │  -> snapshot        │        │  TrafficTotals           │
//!      └─────────────────────┘        └──────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! peer-monitor --port 8080
//! PORT=9000 peer-monitor
//! ```

pub mod activity;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod registry;
pub mod sampler;
pub mod state;

pub use activity::{ACTIVITY_LOG_CAPACITY, ActivityLog, ActivityLogEntry, RECENT_LOG_WINDOW};
pub use config::{Cli, MonitorConfig};
pub use dashboard::{MAX_BODY_BYTES, monitor_routes};
pub use error::{MonitorError, Result};
pub use registry::{PeerRecord, PeerRegistry, SendReceipt, SendRequest, TrafficTotals};
pub use sampler::{ResourceSampler, ResourceSnapshot};
pub use state::MonitorState;

use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Bind the HTTP server and serve until `shutdown` resolves.
///
/// Starts the resource sampler for the lifetime of the server and records
/// the start-up in the activity log.
pub async fn run_server(
    config: &MonitorConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let state = Arc::new(MonitorState::new());
    let sampler = Arc::new(ResourceSampler::start());
    let routes = monitor_routes(state.clone(), sampler.clone());

    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(config.bind_addr, shutdown)
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    state
        .log_event(format!("server started on http://{addr}/"))
        .await;
    info!("Peer monitor listening on http://{}/", addr);

    server.await;

    info!("Peer monitor stopped");
    Ok(())
}
