//! RPC contract between the recorder client and the recorder server.
//!
//! The single remote operation is `record_temperature(device_id, sensor_id,
//! time, temperature) -> status`, carried as JSON-RPC 2.0 over HTTP. This
//! crate holds the record type, the wire envelope, the [`RecordTemperature`]
//! seam and the HTTP client used by the recorder client.

pub mod error;
pub mod proxy;
pub mod wire;

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use error::TransportError;
pub use proxy::RecorderProxy;

/// Name of the remote method.
pub const RECORD_TEMPERATURE: &str = "record_temperature";

/// Status returned when the reading was stored.
pub const STATUS_STORED: i32 = 0;

/// Status returned when the server failed to store the reading.
pub const STATUS_STORAGE_FAILURE: i32 = 1;

/// One temperature reading, as sent by the client and stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRecord {
    /// Identifies the host device.
    pub device_id: String,
    /// Identifies the sensor on the device.
    pub sensor_id: String,
    /// Seconds since the Unix epoch at which the reading was taken.
    pub time: f64,
    /// Degrees Celsius.
    pub temperature: f64,
}

impl TemperatureRecord {
    pub fn new(
        device_id: impl Into<String>,
        sensor_id: impl Into<String>,
        time: f64,
        temperature: f64,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            sensor_id: sensor_id.into(),
            time,
            temperature,
        }
    }
}

/// Something that accepts temperature records and answers with a status code.
///
/// Implemented by [`RecorderProxy`] for remote calls and by the server's
/// recorder for in-process use.
pub trait RecordTemperature: Send + Sync {
    /// Records one reading, returning [`STATUS_STORED`] or
    /// [`STATUS_STORAGE_FAILURE`] (or any other status the server chooses).
    fn record_temperature(
        &self,
        record: TemperatureRecord,
    ) -> impl Future<Output = Result<i32, TransportError>> + Send;
}

impl<T: RecordTemperature> RecordTemperature for Arc<T> {
    async fn record_temperature(&self, record: TemperatureRecord) -> Result<i32, TransportError> {
        (**self).record_temperature(record).await
    }
}
