//! One-wire thermometer support via the kernel's w1 sysfs interface.

mod sensor;
mod source;

pub use sensor::{parse_w1_slave, W1Sensor};
pub use source::W1SensorSource;

/// Family codes of one-wire devices that are thermometers.
/// (DS18S20, DS1822, DS18B20, DS1825, DS28EA00)
pub const THERMOMETER_FAMILIES: [&str; 5] = ["10", "22", "28", "3b", "42"];

/// Raw value reported by a DS18x20 that has not completed a conversion since power-on.
pub const RESET_VALUE_MILLIDEGREES: i64 = 85_000;
