//! Rig constants and analysis configuration.
//!
//! Every constant the analysis depends on is exposed here by name. The
//! [`AnalysisConfig`] defaults are exactly these constants; overrides come
//! from the builder methods or from a JSON file loaded by `thermolab-io`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of temperature sensors on the rig.
pub const SENSOR_COUNT: usize = 10;

/// Max allowed change of a sensor between records to count as stable for calibration.
pub const CALIBRATION_TOLERANCE: f64 = 0.001;

/// Max allowed change of a sensor between records to count as stable for gradients.
pub const GRADIENT_TOLERANCE: f64 = 0.0075;

/// Max number of calibration windows per run.
pub const MAX_CALIBRATIONS: usize = 8;

/// Max number of stable gradient points per run.
pub const MAX_STABLE_POINTS: usize = 50;

/// Resistance of the heating element (ohm).
pub const HEATER_RESISTANCE_OHM: f64 = 20.0;

/// Contact surface between the aluminium blocks (m^2), 30 mm x 30 mm.
pub const CONTACT_AREA_M2: f64 = 0.000_001 * 900.0;

/// Thermal grease correction, subtracted twice at the block interface (°C).
pub const GREASE_CORRECTION: f64 = 0.0;

/// Relative error assumed on every temperature measurement.
pub const RELATIVE_ERROR: f64 = 0.01;

/// Only every n-th raw record is analysed.
pub const SUBSAMPLE_STRIDE: usize = 50;

/// Subsampled records that must pass before a bath change arms a calibration search.
pub const ARMING_DEBOUNCE: usize = 50;

/// Consecutive stable records required before a stable point is committed.
pub const COMMIT_DEBOUNCE: usize = 2;

/// Max number of runs in one batch.
pub const MAX_RUNS: usize = 100;

/// Relative band around a calibration setpoint inside which it is applied.
pub const SETPOINT_MATCH_FRACTION: f64 = 0.05;

/// Axial position of the interface between the two blocks (mm).
pub const INTERFACE_POSITION_MM: f64 = 40.0;

/// Physical positions ignored by the equilibrium detector and the gradient fit.
pub const UNINFORMATIVE_POSITIONS: [usize; 2] = [0, SENSOR_COUNT - 1];

/// Physical position of the first sensor used in the gradient fit.
pub const FIRST_AXIAL_POSITION: usize = 1;

/// Axial distance (mm) of physical positions 1..=8.
pub const AXIAL_POSITIONS_MM: [f64; 8] = [72.0, 64.0, 56.0, 48.0, 32.0, 24.0, 16.0, 8.0];

/// Fit range of the segment below the interface (mm). The 0.1 mm overhang
/// keeps a sample sitting on the interface inside the range.
pub const NEAR_FIT_RANGE_MM: (f64, f64) = (0.0, 40.1);

/// Fit range of the segment above the interface (mm).
pub const FAR_FIT_RANGE_MM: (f64, f64) = (39.9, 80.0);

/// Encoding of the integer time stamp carried by every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ClockFormat {
    /// Wall clock packed as decimal `HHMMSS`; wraps every day.
    #[default]
    Hms,
    /// Plain seconds; only rebased to the first record.
    Seconds,
}

/// Which phases run for every entry of the run list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AnalysisMode {
    /// Calibration pass only.
    Calibration,
    /// Calibration pass followed by the gradient analysis pass.
    #[default]
    Full,
}

/// Configuration for the run analysis.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalysisConfig {
    /// Stability tolerance during the calibration search (°C).
    pub calibration_tolerance: f64,
    /// Stability tolerance during the gradient analysis (°C).
    pub gradient_tolerance: f64,
    /// Max calibration windows collected per run.
    pub max_calibrations: usize,
    /// Max stable points committed per run.
    pub max_stable_points: usize,
    /// Heater resistance (ohm).
    pub heater_resistance: f64,
    /// Contact area between the blocks (m^2).
    pub contact_area: f64,
    /// Grease correction at the interface (°C).
    pub grease_correction: f64,
    /// Relative measurement error used for error bars and fit weights.
    pub relative_error: f64,
    /// Subsampling stride over the raw record stream.
    pub subsample_stride: usize,
    /// Debounce (subsampled records) for arming a calibration search.
    pub arming_debounce: usize,
    /// Debounce (stable records) before committing a stable point.
    pub commit_debounce: usize,
    /// Max runs accepted from a run list.
    pub max_runs: usize,
    /// Relative band for matching a calibration setpoint.
    pub setpoint_match_fraction: f64,
    /// Encoding of record time stamps.
    pub clock: ClockFormat,
    /// Phases to run.
    pub mode: AnalysisMode,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            calibration_tolerance: CALIBRATION_TOLERANCE,
            gradient_tolerance: GRADIENT_TOLERANCE,
            max_calibrations: MAX_CALIBRATIONS,
            max_stable_points: MAX_STABLE_POINTS,
            heater_resistance: HEATER_RESISTANCE_OHM,
            contact_area: CONTACT_AREA_M2,
            grease_correction: GREASE_CORRECTION,
            relative_error: RELATIVE_ERROR,
            subsample_stride: SUBSAMPLE_STRIDE,
            arming_debounce: ARMING_DEBOUNCE,
            commit_debounce: COMMIT_DEBOUNCE,
            max_runs: MAX_RUNS,
            setpoint_match_fraction: SETPOINT_MATCH_FRACTION,
            clock: ClockFormat::Hms,
            mode: AnalysisMode::Full,
        }
    }
}

impl AnalysisConfig {
    /// Creates a configuration with the rig defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subsampling stride.
    #[must_use]
    pub fn with_subsample_stride(mut self, stride: usize) -> Self {
        self.subsample_stride = stride;
        self
    }

    /// Sets both stability tolerances.
    #[must_use]
    pub fn with_tolerances(mut self, calibration: f64, gradient: f64) -> Self {
        self.calibration_tolerance = calibration;
        self.gradient_tolerance = gradient;
        self
    }

    /// Sets the per-run capacities.
    #[must_use]
    pub fn with_capacities(mut self, max_calibrations: usize, max_stable_points: usize) -> Self {
        self.max_calibrations = max_calibrations;
        self.max_stable_points = max_stable_points;
        self
    }

    /// Sets the grease correction.
    #[must_use]
    pub fn with_grease_correction(mut self, correction: f64) -> Self {
        self.grease_correction = correction;
        self
    }

    /// Sets the clock encoding.
    #[must_use]
    pub fn with_clock(mut self, clock: ClockFormat) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the analysis mode.
    #[must_use]
    pub fn with_mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = mode;
        self
    }

    /// Checks that every parameter is usable.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] naming the first invalid parameter.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("calibration_tolerance", self.calibration_tolerance),
            ("gradient_tolerance", self.gradient_tolerance),
            ("heater_resistance", self.heater_resistance),
            ("contact_area", self.contact_area),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::ConfigError(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        let non_negative = [
            ("relative_error", self.relative_error),
            ("setpoint_match_fraction", self.setpoint_match_fraction),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::ConfigError(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }

        if !self.grease_correction.is_finite() {
            return Err(Error::ConfigError(
                "grease_correction must be finite".to_string(),
            ));
        }

        let counts = [
            ("subsample_stride", self.subsample_stride),
            ("max_calibrations", self.max_calibrations),
            ("max_stable_points", self.max_stable_points),
            ("max_runs", self.max_runs),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(Error::ConfigError(format!("{name} must be at least 1")));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = AnalysisConfig::default();
        assert_eq!(config.max_calibrations, 8);
        assert_eq!(config.max_stable_points, 50);
        assert_eq!(config.subsample_stride, 50);
        assert!((config.contact_area - 9.0e-4).abs() < 1e-12);
        assert_eq!(config.mode, AnalysisMode::Full);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = AnalysisConfig::new()
            .with_subsample_stride(1)
            .with_tolerances(0.01, 0.02)
            .with_capacities(2, 3)
            .with_clock(ClockFormat::Seconds)
            .with_mode(AnalysisMode::Calibration);

        assert_eq!(config.subsample_stride, 1);
        assert!((config.gradient_tolerance - 0.02).abs() < f64::EPSILON);
        assert_eq!(config.max_stable_points, 3);
        assert_eq!(config.clock, ClockFormat::Seconds);
        assert_eq!(config.mode, AnalysisMode::Calibration);
    }

    #[test]
    fn test_validate_rejects_zero_stride() {
        let config = AnalysisConfig::new().with_subsample_stride(0);
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("subsample_stride"), "{err}");
    }

    #[test]
    fn test_validate_rejects_negative_tolerance() {
        let config = AnalysisConfig::new().with_tolerances(-1.0, 0.1);
        assert!(config.validate().is_err());
    }
}
