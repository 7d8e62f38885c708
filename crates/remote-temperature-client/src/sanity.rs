//! Sanity checking of sensor readings before they are sent.

use thiserror::Error;

/// A reading outside the configured bounds.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SanityError {
    #[error(
        "Temperature reading ({temperature}C) for sensor {sensor_id} failed sanity check; \
         temperature is below low threshold of {low}C"
    )]
    BelowLow {
        sensor_id: String,
        temperature: f64,
        low: f64,
    },

    #[error(
        "Temperature reading ({temperature}C) for sensor {sensor_id} failed sanity check; \
         temperature is above high threshold of {high}C"
    )]
    AboveHigh {
        sensor_id: String,
        temperature: f64,
        high: f64,
    },
}

/// Inclusive range a reading must fall in. A missing bound is not checked.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SanityBounds {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl SanityBounds {
    pub fn new(low: Option<f64>, high: Option<f64>) -> Self {
        Self { low, high }
    }

    /// Bounds that accept every reading.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Accepts `temperature` iff it is `>= low` and `<= high` for each bound present.
    ///
    /// NaN fails against any present bound.
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn check(&self, sensor_id: &str, temperature: f64) -> Result<(), SanityError> {
        if let Some(low) = self.low {
            if !(temperature >= low) {
                return Err(SanityError::BelowLow {
                    sensor_id: sensor_id.to_string(),
                    temperature,
                    low,
                });
            }
        }

        if let Some(high) = self.high {
            if !(temperature <= high) {
                return Err(SanityError::AboveHigh {
                    sensor_id: sensor_id.to_string(),
                    temperature,
                    high,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_bounds() {
        let bounds = SanityBounds::new(Some(-15.0), Some(100.0));
        assert!(bounds.check("s1", 21.5).is_ok());
        assert!(bounds.check("s1", -15.0).is_ok());
        assert!(bounds.check("s1", 100.0).is_ok());
    }

    #[test]
    fn test_below_low() {
        let bounds = SanityBounds::new(Some(-15.0), Some(100.0));
        assert_eq!(
            bounds.check("s1", -15.5),
            Err(SanityError::BelowLow {
                sensor_id: "s1".to_string(),
                temperature: -15.5,
                low: -15.0,
            })
        );
    }

    #[test]
    fn test_above_high() {
        let bounds = SanityBounds::new(Some(-15.0), Some(100.0));
        assert!(matches!(
            bounds.check("s1", 100.1),
            Err(SanityError::AboveHigh { high, .. }) if high == 100.0
        ));
    }

    #[test]
    fn test_missing_bounds_disable_checks() {
        assert!(SanityBounds::unbounded().check("s1", -1e9).is_ok());
        assert!(SanityBounds::unbounded().check("s1", f64::NAN).is_ok());
        assert!(SanityBounds::new(None, Some(0.0)).check("s1", -1e9).is_ok());
        assert!(SanityBounds::new(Some(0.0), None).check("s1", 1e9).is_ok());
    }

    #[test]
    fn test_nan_fails_present_bound() {
        assert!(SanityBounds::new(Some(0.0), None).check("s1", f64::NAN).is_err());
        assert!(SanityBounds::new(None, Some(0.0)).check("s1", f64::NAN).is_err());
    }

    #[test]
    fn test_matches_definition_over_grid() {
        let values = [-50.0, -15.0, -0.5, 0.0, 22.0, 99.9, 100.0, 150.0];
        let bounds = [None, Some(-15.0), Some(0.0), Some(100.0)];
        for &t in &values {
            for &low in &bounds {
                for &high in &bounds {
                    let expected =
                        low.map_or(true, |l| t >= l) && high.map_or(true, |h| t <= h);
                    let actual = SanityBounds::new(low, high).check("s", t).is_ok();
                    assert_eq!(actual, expected, "t={t} low={low:?} high={high:?}");
                }
            }
        }
    }

    #[test]
    fn test_message_names_sensor_value_and_bound() {
        let err = SanityBounds::new(Some(-15.0), None)
            .check("28-abc", -40.0)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("28-abc"));
        assert!(message.contains("-40"));
        assert!(message.contains("-15"));
    }
}
