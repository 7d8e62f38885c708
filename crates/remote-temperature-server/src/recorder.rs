//! Server-side handling of `record_temperature`.

use remote_temperature_rpc::{
    RecordTemperature, TemperatureRecord, TransportError, STATUS_STORAGE_FAILURE, STATUS_STORED,
};
use tracing::{debug, error, Instrument, Span};

use crate::storage::Storage;

/// Stores incoming readings and maps the outcome to a status code.
pub struct Recorder {
    storage: Storage,
    span: Span,
}

impl Recorder {
    /// Creates a recorder writing to `storage`, logging inside `span`.
    pub fn new(storage: Storage, span: Span) -> Self {
        Self { storage, span }
    }

    /// The underlying store.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Stores `record`, returning [`STATUS_STORED`] or [`STATUS_STORAGE_FAILURE`].
    ///
    /// Storage errors are logged here and never reach the caller.
    pub async fn record(&self, record: TemperatureRecord) -> i32 {
        async {
            debug!(
                "Received temperature ({}) from sensor {} on device {} read at time {}",
                record.temperature, record.sensor_id, record.device_id, record.time
            );
            match self.storage.append(&record).await {
                Ok(()) => STATUS_STORED,
                Err(e) => {
                    error!("Database write failed: {}", e);
                    STATUS_STORAGE_FAILURE
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }
}

impl RecordTemperature for Recorder {
    async fn record_temperature(&self, record: TemperatureRecord) -> Result<i32, TransportError> {
        Ok(self.record(record).await)
    }
}
