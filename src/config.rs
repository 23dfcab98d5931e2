//! `ticketd` configuration: command line flags with environment fallbacks.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::ArgAction;
use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 8002;
pub const DEFAULT_SYNC_SECS: u64 = 60;
pub const DEFAULT_SNAPSHOT: &str = "ticketd.snapshot";

#[derive(clap::Parser, Clone, Debug)]
#[clap(name = "ticketd", version, about = "Priority ticket dispatch server")]
pub struct ServerConfig {
    /// Address to listen on.
    #[clap(short = 'H', long, env = "TICKETD_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// TCP port to listen on.
    #[clap(short, long, env = "TICKETD_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Snapshot file, loaded at start and rewritten every sync interval.
    #[clap(short, long, env = "TICKETD_FILE", default_value = DEFAULT_SNAPSHOT)]
    pub file: PathBuf,

    /// Seconds between snapshot writes.
    #[clap(short, long, env = "TICKETD_SYNC", default_value_t = DEFAULT_SYNC_SECS)]
    pub sync: u64,

    #[clap(
        short,
        action = ArgAction::Count,
        env = "TICKETD_LOG",
        help = "Use verbose output (-vv very verbose)"
    )]
    pub verbose: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: DEFAULT_PORT,
            file: PathBuf::from(DEFAULT_SNAPSHOT),
            sync: DEFAULT_SYNC_SECS,
            verbose: 0,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::new("port must be > 0"));
        }
        if self.sync == 0 {
            return Err(ConfigError::new("sync interval must be > 0"));
        }
        if self.file.as_os_str().is_empty() {
            return Err(ConfigError::new("snapshot path must not be empty"));
        }
        self.bind_addr().map(|_| ())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|err| ConfigError::new(format!("invalid bind address {}: {err}", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync)
    }

    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Installs the global subscriber. `RUST_LOG`, when set, wins over `-v`.
    pub fn configure_logging(&self) {
        let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
            Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
            _ => EnvFilter::default().add_directive(LevelFilter::from_level(self.log_level()).into()),
        };

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_filter(filter),
            )
            .init();
    }
}
