//! Start-up configuration.
//!
//! The listening port comes from `--port` unless the `PORT` environment
//! variable holds a valid port, which takes precedence.

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Port used when neither `--port` nor `PORT` is given.
pub const DEFAULT_PORT: u16 = 8080;

/// Environment variable that overrides `--port`.
pub const PORT_ENV: &str = "PORT";

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(name = "peer-monitor")]
#[command(about = "Peer liveness and traffic monitor with an embedded dashboard")]
#[command(version)]
pub struct Cli {
    /// HTTP listen port (overridden by the PORT environment variable)
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind the HTTP server to
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Default log filter when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub bind_addr: SocketAddr,
    pub log_level: String,
}

impl MonitorConfig {
    /// Parse process arguments and apply the `PORT` override.
    #[must_use]
    pub fn from_env() -> Self {
        let cli = Cli::parse();
        let env_port = std::env::var(PORT_ENV).ok();
        Self::from_cli(cli, env_port.as_deref())
    }

    #[must_use]
    pub fn from_cli(cli: Cli, env_port: Option<&str>) -> Self {
        let port = resolve_port(cli.port, env_port);
        Self {
            bind_addr: SocketAddr::new(cli.bind, port),
            log_level: cli.log_level,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            log_level: "info".to_string(),
        }
    }
}

/// `env_port` wins when it parses as a port; otherwise the flag value.
#[must_use]
pub fn resolve_port(flag: u16, env_port: Option<&str>) -> u16 {
    env_port
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(flag)
}
