//! A single one-wire thermometer.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;

use super::RESET_VALUE_MILLIDEGREES;
use crate::{Error, Result, Sensor};

/// A one-wire thermometer backed by a sysfs slave directory.
#[derive(Debug, Clone)]
pub struct W1Sensor {
    id: String,
    slave_path: PathBuf,
}

impl W1Sensor {
    /// Creates a sensor for the slave directory `dir` (e.g. `.../28-00000588806a`).
    ///
    /// The identifier is the serial number after the family code.
    pub fn new(id: impl Into<String>, dir: &Path) -> Self {
        Self {
            id: id.into(),
            slave_path: dir.join("w1_slave"),
        }
    }
}

impl Sensor for W1Sensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn temperature(&self) -> Result<f64> {
        let content = fs::read_to_string(&self.slave_path).map_err(|source| Error::Io {
            path: self.slave_path.clone(),
            source,
        })?;
        trace!("w1_slave for {}: {:?}", self.id, content);
        parse_w1_slave(&self.id, &content)
    }
}

/// Parses the two-line output of a `w1_slave` file into degrees Celsius.
///
/// ```text
/// 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
/// 72 01 4b 46 7f ff 0e 10 57 t=23125
/// ```
pub fn parse_w1_slave(sensor_id: &str, content: &str) -> Result<f64> {
    let mut lines = content.lines();
    let malformed = |reason: &str| Error::Malformed {
        sensor: sensor_id.to_string(),
        reason: reason.to_string(),
    };

    let crc_line = lines.next().ok_or_else(|| malformed("empty output"))?;
    if !crc_line.trim_end().ends_with("YES") {
        return Err(Error::NotReady(sensor_id.to_string()));
    }

    let data_line = lines.next().ok_or_else(|| malformed("missing data line"))?;
    let (_, raw) = data_line
        .rsplit_once("t=")
        .ok_or_else(|| malformed("missing t= field"))?;
    let millidegrees: i64 = raw
        .trim()
        .parse()
        .map_err(|_| malformed(&format!("invalid temperature value {:?}", raw.trim())))?;

    if millidegrees == RESET_VALUE_MILLIDEGREES {
        return Err(Error::ResetValue(sensor_id.to_string()));
    }

    Ok(millidegrees as f64 / 1000.0)
}
