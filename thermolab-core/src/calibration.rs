//! Calibration data types.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::SENSOR_COUNT;
use crate::record::Temperatures;
use crate::run::RunId;

/// A stable heater-off window found during the calibration search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationPoint {
    /// Run the window belongs to.
    pub run: RunId,
    /// Calibration index within the run.
    pub index: usize,
    /// Commanded bath temperature at detection (°C).
    pub working_temperature: f64,
    /// Accumulated sensor temperatures at detection, by position (°C).
    pub temperatures: Temperatures,
    /// Detection time (s since start of the pass).
    pub time: f64,
    /// Horizontal plot shift separating windows drawn on one axis.
    pub plot_offset: f64,
}

impl CalibrationPoint {
    /// Offset of one sensor against the bath at this window.
    #[inline]
    #[must_use]
    pub fn residual(&self, position: usize) -> f64 {
        self.temperatures[position] - self.working_temperature
    }

    /// Offsets of every sensor against the bath.
    #[must_use]
    pub fn residuals(&self) -> Temperatures {
        let mut residuals = [0.0; SENSOR_COUNT];
        for (position, residual) in residuals.iter_mut().enumerate() {
            *residual = self.residual(position);
        }
        residuals
    }
}

/// Per-sensor average offset of a run and its spread.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationSet {
    /// Run the set belongs to.
    pub run: RunId,
    /// Number of windows averaged.
    pub windows: usize,
    /// Mean offset per position (°C).
    pub mean: Temperatures,
    /// Population standard deviation per position (°C).
    pub std_dev: Temperatures,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_residuals() {
        let mut temperatures = [20.0; SENSOR_COUNT];
        temperatures[3] = 20.25;
        let point = CalibrationPoint {
            run: 0,
            index: 0,
            working_temperature: 20.0,
            temperatures,
            time: 12.0,
            plot_offset: 0.1,
        };
        let residuals = point.residuals();
        assert!((residuals[3] - 0.25).abs() < 1e-12);
        assert!(residuals[0].abs() < 1e-12);
    }
}
