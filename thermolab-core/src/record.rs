//! Sensor records and the sources that yield them.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::SENSOR_COUNT;
use crate::error::Result;

/// One temperature per sensor.
pub type Temperatures = [f64; SENSOR_COUNT];

/// A record exactly as the data source stores it.
///
/// Temperatures are in channel order and the time is the logger's raw stamp.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawRecord {
    /// Raw logger time stamp.
    pub time: u32,
    /// Temperatures in channel order (°C).
    pub temperatures: Temperatures,
    /// Heater current (A).
    pub current: f64,
    /// Commanded bath temperature (°C).
    pub working_temperature: f64,
}

impl RawRecord {
    /// Creates a new raw record.
    #[must_use]
    pub fn new(time: u32, temperatures: Temperatures, current: f64, working_temperature: f64) -> Self {
        Self {
            time,
            temperatures,
            current,
            working_temperature,
        }
    }
}

/// A subsampled record after time unwrap and sensor reordering.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorRecord {
    /// Seconds since the first record of the pass.
    pub time: f64,
    /// Temperatures in physical position order (°C).
    pub temperatures: Temperatures,
    /// Heater current (A).
    pub current: f64,
    /// Commanded bath temperature (°C).
    pub working_temperature: f64,
}

/// A source of raw records for one run.
///
/// Every call to [`RecordSource::records`] starts a fresh forward pass over
/// the same data; the analysis makes one pass per phase.
pub trait RecordSource {
    /// Iterator over the records of one pass.
    type Records<'a>: Iterator<Item = RawRecord>
    where
        Self: 'a;

    /// Starts a new pass.
    ///
    /// # Errors
    /// Returns an error if the underlying data cannot be read.
    fn records(&self) -> Result<Self::Records<'_>>;
}

impl RecordSource for [RawRecord] {
    type Records<'a> = std::iter::Copied<std::slice::Iter<'a, RawRecord>>;

    fn records(&self) -> Result<Self::Records<'_>> {
        Ok(self.iter().copied())
    }
}

impl RecordSource for Vec<RawRecord> {
    type Records<'a> = std::iter::Copied<std::slice::Iter<'a, RawRecord>>;

    fn records(&self) -> Result<Self::Records<'_>> {
        Ok(self.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_source_restarts() {
        let records = vec![
            RawRecord::new(1, [20.0; SENSOR_COUNT], 0.0, 20.0),
            RawRecord::new(2, [21.0; SENSOR_COUNT], 0.5, 20.0),
        ];
        assert_eq!(records.records().unwrap().count(), 2);
        let first = records.records().unwrap().next().unwrap();
        assert_eq!(first.time, 1);
    }
}
