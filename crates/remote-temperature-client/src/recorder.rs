//! The client poll loop.
//!
//! Every period the client enumerates the available sensors, reads each one,
//! sanity checks the reading and sends it to the server. Each reading is
//! attempted once: anything that goes wrong is logged and the reading is
//! dropped, so one bad sensor or an unreachable server never stops the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use remote_temperature_rpc::{RecordTemperature, TemperatureRecord, TransportError, STATUS_STORED};
use remote_temperature_sensors::{Error as SensorError, Sensor, SensorSource};
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, error, info, Instrument, Span};

use crate::sanity::{SanityBounds, SanityError};

/// Why a reading was not recorded.
#[derive(Error, Debug)]
pub enum RecordError {
    /// The sensor could not be read.
    #[error(transparent)]
    Sensor(#[from] SensorError),

    /// The sensor produced NaN or an infinity, which cannot be sent.
    #[error("Temperature reading ({temperature}C) for sensor {sensor_id} is not a finite number")]
    NotFinite { sensor_id: String, temperature: f64 },

    /// The reading was outside the sanity bounds.
    #[error(transparent)]
    Sanity(#[from] SanityError),

    /// The server could not be called.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server was called but did not store the reading.
    #[error("Received error status {0} from remote server")]
    Rejected(i32),

    /// Shutdown was requested while the sensor was being read.
    #[error("Shutdown requested; not sending reading from sensor {0}")]
    ShuttingDown(String),
}

struct ShutdownState {
    running: AtomicBool,
    wake: Notify,
}

/// Cloneable handle used to stop a [`RecorderClient`] from another task.
#[derive(Clone)]
pub struct ShutdownHandle {
    state: Arc<ShutdownState>,
}

impl ShutdownHandle {
    fn new() -> Self {
        Self {
            state: Arc::new(ShutdownState {
                running: AtomicBool::new(true),
                wake: Notify::new(),
            }),
        }
    }

    /// Asks the loop to stop at its next check. Idempotent.
    pub fn request_shutdown(&self) {
        self.state.running.store(false, Ordering::SeqCst);
        // notify_one keeps a permit if the loop is not sleeping yet.
        self.state.wake.notify_one();
    }

    /// Whether shutdown has not been requested yet.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Sleeps for `period` or until shutdown is requested.
    async fn sleep(&self, period: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = self.state.wake.notified() => {}
        }
    }
}

/// Reads sensors and ships their readings to a recorder.
pub struct RecorderClient<S, R> {
    device_id: String,
    period: Duration,
    bounds: SanityBounds,
    sensors: S,
    recorder: R,
    shutdown: ShutdownHandle,
    span: Span,
}

impl<S, R> RecorderClient<S, R>
where
    S: SensorSource,
    R: RecordTemperature,
{
    /// Creates a client. Log output is emitted inside `span`.
    pub fn new(
        device_id: impl Into<String>,
        period: Duration,
        bounds: SanityBounds,
        sensors: S,
        recorder: R,
        span: Span,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            period,
            bounds,
            sensors,
            recorder,
            shutdown: ShutdownHandle::new(),
            span,
        }
    }

    /// A handle that can stop this client from a signal handler or another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Stops the loop at its next check. Idempotent.
    pub fn request_shutdown(&self) {
        self.span.in_scope(|| info!("Received quit request"));
        self.shutdown.request_shutdown();
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    /// Polls sensors every period until shutdown is requested.
    pub async fn run_forever(&self) {
        async {
            info!(
                "Polling sensors every {:?} for device {}",
                self.period, self.device_id
            );
            while self.shutdown.is_running() {
                self.poll_cycle().await;
                if !self.shutdown.is_running() {
                    break;
                }
                self.shutdown.sleep(self.period).await;
            }
            info!("quitting");
        }
        .instrument(self.span.clone())
        .await
    }

    /// Reads and records every available sensor once.
    ///
    /// Stops early if shutdown is requested part way through.
    pub async fn poll_cycle(&self) {
        let sensors = match self.sensors.available_sensors() {
            Ok(sensors) => sensors,
            Err(e) => {
                error!("Failed to enumerate sensors: {}", e);
                return;
            }
        };

        for sensor in &sensors {
            if !self.shutdown.is_running() {
                break;
            }
            self.read_and_record(sensor).await;
        }
    }

    /// Reads one sensor and records the reading, logging any failure.
    pub async fn read_and_record(&self, sensor: &Arc<dyn Sensor>) {
        match self.record_reading(sensor).await {
            Ok(()) => {}
            Err(RecordError::Sensor(e)) => {
                error!("Failed to read from sensor {}: {}", sensor.id(), e);
            }
            Err(e @ RecordError::NotFinite { .. }) => {
                error!("Failed to read from sensor {}: {}", sensor.id(), e);
            }
            Err(RecordError::Sanity(e)) => {
                error!("Failed to read from sensor {}: {}", sensor.id(), e);
            }
            Err(RecordError::Transport(e)) => {
                error!("Failed to send reading from sensor {}: {}", sensor.id(), e);
            }
            Err(e @ RecordError::Rejected(_)) => {
                error!("{}", e);
            }
            Err(e @ RecordError::ShuttingDown(_)) => {
                debug!("{}", e);
            }
        }
    }

    /// Reads one sensor and records the reading.
    pub async fn record_reading(&self, sensor: &Arc<dyn Sensor>) -> Result<(), RecordError> {
        let reader = Arc::clone(sensor);
        let temperature = match tokio::task::spawn_blocking(move || reader.temperature()).await {
            Ok(reading) => reading?,
            Err(e) => {
                debug!("Sensor read task for {} failed: {}", sensor.id(), e);
                return Err(SensorError::Unavailable(sensor.id().to_string()).into());
            }
        };
        let time = unix_timestamp();

        if !temperature.is_finite() {
            return Err(RecordError::NotFinite {
                sensor_id: sensor.id().to_string(),
                temperature,
            });
        }
        self.bounds.check(sensor.id(), temperature)?;

        debug!(
            "Read temperature {}C from sensor {} on device {} at timestamp {}",
            temperature,
            sensor.id(),
            self.device_id,
            time
        );

        // The read may have blocked across a shutdown request.
        if !self.shutdown.is_running() {
            return Err(RecordError::ShuttingDown(sensor.id().to_string()));
        }

        let record =
            TemperatureRecord::new(self.device_id.as_str(), sensor.id(), time, temperature);
        let status = self.recorder.record_temperature(record).await?;
        if status != STATUS_STORED {
            return Err(RecordError::Rejected(status));
        }
        Ok(())
    }
}

/// Current time as fractional seconds since the Unix epoch.
fn unix_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
