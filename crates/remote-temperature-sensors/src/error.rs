//! Error types for the sensor library.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when enumerating or reading sensors.
#[derive(Error, Debug)]
pub enum Error {
    /// The one-wire bus directory does not exist (kernel modules not loaded?).
    #[error("one-wire bus not available at {}", .0.display())]
    BusUnavailable(PathBuf),

    /// Reading from sysfs failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The sensor reported a CRC failure; the conversion is not ready yet.
    #[error("sensor {0} is not ready to be read")]
    NotReady(String),

    /// The sensor returned its power-on reset value instead of a measurement.
    #[error("sensor {0} returned the power-on reset value (85C)")]
    ResetValue(String),

    /// The sensor output could not be parsed.
    #[error("malformed output from sensor {sensor}: {reason}")]
    Malformed { sensor: String, reason: String },

    /// The sensor exists but cannot produce a reading.
    #[error("sensor {0} is unavailable")]
    Unavailable(String),
}
