//! Remote Temperature Sensor Library
//!
//! Provides the sensor capability consumed by the recorder client: a source
//! that enumerates the sensors currently attached to the device, each with a
//! stable identifier and a fallible temperature read.

pub mod error;
pub mod w1;

use std::sync::Arc;

pub use error::{Error, Result};
pub use w1::{W1Sensor, W1SensorSource};

/// Default sysfs directory holding one-wire slave devices.
pub const W1_DEVICES_DIR: &str = "/sys/bus/w1/devices";

/// A single temperature sensor.
pub trait Sensor: Send + Sync {
    /// Returns the sensor identifier, stable for the lifetime of the sensor.
    fn id(&self) -> &str;

    /// Reads the current temperature in degrees Celsius.
    ///
    /// May block while the hardware performs a conversion.
    fn temperature(&self) -> Result<f64>;
}

/// Something that can list the sensors currently available.
pub trait SensorSource: Send + Sync {
    /// Returns the sensors available right now.
    fn available_sensors(&self) -> Result<Vec<Arc<dyn Sensor>>>;
}
