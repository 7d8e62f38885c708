//! Remote Temperature Client
//!
//! Reads the one-wire thermometers attached to this device every period and
//! sends the readings to a remote temperature server.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, info_span};
use tracing_subscriber::EnvFilter;

use remote_temperature_client::config::{Config, LogConfig, LogLevel};
use remote_temperature_client::RecorderClient;
use remote_temperature_rpc::RecorderProxy;
use remote_temperature_sensors::w1::W1SensorSource;

#[derive(Parser)]
#[command(name = "remote-temperature-client")]
#[command(about = "Log temperatures from one-wire sensors to a remote server")]
#[command(version)]
struct Cli {
    /// TOML configuration file; command line options take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// The URL of the remote server to send temperatures to
    #[arg(long)]
    server: Option<String>,

    /// An identifier for this device [default: unknown]
    #[arg(long)]
    device_id: Option<String>,

    /// The number of seconds between sensor reads [default: 60]
    #[arg(long)]
    period: Option<f64>,

    /// Discard readings below this temperature in degrees C [default: -15]
    #[arg(long, allow_negative_numbers = true)]
    sanity_check_low: Option<f64>,

    /// Discard readings above this temperature in degrees C [default: 100]
    #[arg(long, allow_negative_numbers = true)]
    sanity_check_high: Option<f64>,

    /// Send every reading regardless of its value
    #[arg(long)]
    no_sanity_check: bool,

    /// Seconds to wait for each reply from the server [default: 10]
    #[arg(long)]
    timeout: Option<f64>,

    /// Directory containing one-wire devices [default: /sys/bus/w1/devices]
    #[arg(long)]
    sensor_dir: Option<PathBuf>,

    /// The location of a file to log messages to
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// The severity threshold for events to be logged [default: INFO]
    #[arg(long, value_enum, ignore_case = true)]
    log_level: Option<LogLevel>,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(server) = self.server {
            config.server = Some(server);
        }
        if let Some(device_id) = self.device_id {
            config.device_id = device_id;
        }
        if let Some(period) = self.period {
            config.period = period;
        }
        if let Some(low) = self.sanity_check_low {
            config.sanity_check_low = Some(low);
        }
        if let Some(high) = self.sanity_check_high {
            config.sanity_check_high = Some(high);
        }
        if self.no_sanity_check {
            config.sanity_check = false;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(dir) = self.sensor_dir {
            config.sensor_dir = dir;
        }
        if let Some(file) = self.log_file {
            config.log.file = Some(file);
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Cli::parse().into_config()?;
    init_logging(&config.log)?;

    if let Err(e) = run(config).await {
        error!("Failed to run client: {:#}", e);
        return Err(e);
    }
    Ok(())
}

fn init_logging(log: &LogConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(log.level.filter().into());

    match &log.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

async fn run(config: Config) -> Result<()> {
    info!("remote-temperature-client starting");

    let proxy = RecorderProxy::with_timeout(config.server_url(), config.timeout())
        .with_context(|| format!("Invalid server URL {}", config.server_url()))?;
    info!("Sending readings to {}", proxy.url());

    let client = RecorderClient::new(
        config.device_id.as_str(),
        config.period(),
        config.sanity_bounds(),
        W1SensorSource::new(&config.sensor_dir),
        proxy,
        info_span!("client", device_id = %config.device_id),
    );

    // Setup Unix signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let handle = client.shutdown_handle();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
            }
        }
        handle.request_shutdown();
    });

    client.run_forever().await;
    Ok(())
}
