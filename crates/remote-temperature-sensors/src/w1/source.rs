//! Enumeration of one-wire thermometers.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use super::{W1Sensor, THERMOMETER_FAMILIES};
use crate::{Error, Result, Sensor, SensorSource};

/// Lists the thermometers present on the one-wire bus.
#[derive(Debug, Clone)]
pub struct W1SensorSource {
    devices_dir: PathBuf,
}

impl W1SensorSource {
    /// Creates a source that scans `devices_dir`.
    pub fn new(devices_dir: impl Into<PathBuf>) -> Self {
        Self {
            devices_dir: devices_dir.into(),
        }
    }

    /// Splits a slave directory name like `28-00000588806a` into
    /// a family code and serial, if it is a thermometer.
    fn thermometer_serial(name: &str) -> Option<&str> {
        let (family, serial) = name.split_once('-')?;
        let family = family.to_ascii_lowercase();
        if serial.is_empty() || !THERMOMETER_FAMILIES.contains(&family.as_str()) {
            return None;
        }
        Some(serial)
    }
}

impl SensorSource for W1SensorSource {
    fn available_sensors(&self) -> Result<Vec<Arc<dyn Sensor>>> {
        if !self.devices_dir.is_dir() {
            return Err(Error::BusUnavailable(self.devices_dir.clone()));
        }

        let entries = fs::read_dir(&self.devices_dir).map_err(|source| Error::Io {
            path: self.devices_dir.clone(),
            source,
        })?;

        let mut found: Vec<(String, PathBuf)> = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(serial) = Self::thermometer_serial(name) {
                found.push((serial.to_string(), entry.path()));
            }
        }
        // read_dir order is unspecified; keep poll order stable.
        found.sort();

        debug!(
            "Found {} thermometer(s) in {}",
            found.len(),
            self.devices_dir.display()
        );

        Ok(found
            .into_iter()
            .map(|(serial, path)| Arc::new(W1Sensor::new(serial, &path)) as Arc<dyn Sensor>)
            .collect())
    }
}
