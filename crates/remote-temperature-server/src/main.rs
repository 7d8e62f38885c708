//! Remote Temperature Server
//!
//! Listens for `record_temperature` calls from remote clients and records
//! the readings in a database.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, info_span};
use tracing_subscriber::EnvFilter;

use remote_temperature_server::config::{Config, LogConfig, LogLevel};
use remote_temperature_server::{rpc, Recorder, Storage};

#[derive(Parser)]
#[command(name = "remote-temperature-server")]
#[command(about = "Record temperatures from remote clients")]
#[command(version)]
struct Cli {
    /// TOML configuration file; command line options take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// The hostname or IP address on which to listen [default: localhost]
    #[arg(long)]
    address: Option<String>,

    /// The port on which to listen [default: 8080]
    #[arg(long)]
    port: Option<u16>,

    /// The path to the database file to record temperatures in [default: /var/temperatures]
    #[arg(long)]
    database: Option<PathBuf>,

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

        if let Some(address) = self.address {
            config.address = address;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(database) = self.database {
            config.database = database;
        }
        if let Some(file) = self.log_file {
            config.log.file = Some(file);
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Cli::parse().into_config()?;
    init_logging(&config.log)?;

    if let Err(e) = run(config).await {
        error!("Failed to run server: {:#}", e);
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
    info!("remote-temperature-server starting");

    let storage = Storage::open(&config.database, info_span!("storage"))
        .await
        .with_context(|| format!("Failed to open database {}", config.database.display()))?;
    let recorder = Arc::new(Recorder::new(storage, info_span!("recorder")));

    let listener = TcpListener::bind((config.address.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to listen on {}:{}", config.address, config.port))?;
    info!("RPC server listening on http://{}", listener.local_addr()?);

    // Setup Unix signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
            }
        }
    };

    rpc::serve(listener, recorder.clone(), shutdown)
        .await
        .context("RPC server failed")?;

    recorder.storage().close().await;
    info!("quitting");
    Ok(())
}
