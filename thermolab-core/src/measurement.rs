//! Stable gradient points.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::record::Temperatures;
use crate::run::RunId;

/// A thermally stable window with the heater running.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StablePoint {
    /// Run the point belongs to.
    pub run: RunId,
    /// Index of the point within the run.
    pub index: usize,
    /// Calibrated temperatures by position (°C).
    pub temperatures: Temperatures,
    /// Commanded bath temperature (°C).
    pub working_temperature: f64,
    /// Heater current (A).
    pub current: f64,
    /// Time of the point (s since start of the pass).
    pub time: f64,
}

impl StablePoint {
    /// Electrical power dissipated in the heater (W).
    #[inline]
    #[must_use]
    pub fn heater_power(&self, resistance: f64) -> f64 {
        resistance * self.current * self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SENSOR_COUNT;

    #[test]
    fn test_heater_power() {
        let point = StablePoint {
            run: 0,
            index: 0,
            temperatures: [25.0; SENSOR_COUNT],
            working_temperature: 20.0,
            current: 0.5,
            time: 100.0,
        };
        assert!((point.heater_power(20.0) - 5.0).abs() < 1e-12);
    }
}
