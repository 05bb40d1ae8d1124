//! JSON configuration overrides.
//!
//! A configuration file holds an `analysis` object whose fields override
//! the rig defaults one by one:
//!
//! ```json
//! { "analysis": { "subsample_stride": 10, "clock": "seconds" } }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use thermolab_core::{AnalysisConfig, AnalysisMode, ClockFormat};

use crate::Result;

#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonConfig {
    analysis: JsonAnalysis,
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct JsonAnalysis {
    calibration_tolerance: f64,
    gradient_tolerance: f64,
    max_calibrations: usize,
    max_stable_points: usize,
    heater_resistance: f64,
    contact_area: f64,
    grease_correction: f64,
    relative_error: f64,
    subsample_stride: usize,
    arming_debounce: usize,
    commit_debounce: usize,
    max_runs: usize,
    setpoint_match_fraction: f64,
    clock: ClockFormat,
    mode: AnalysisMode,
}

impl Default for JsonAnalysis {
    fn default() -> Self {
        let d = AnalysisConfig::default();
        Self {
            calibration_tolerance: d.calibration_tolerance,
            gradient_tolerance: d.gradient_tolerance,
            max_calibrations: d.max_calibrations,
            max_stable_points: d.max_stable_points,
            heater_resistance: d.heater_resistance,
            contact_area: d.contact_area,
            grease_correction: d.grease_correction,
            relative_error: d.relative_error,
            subsample_stride: d.subsample_stride,
            arming_debounce: d.arming_debounce,
            commit_debounce: d.commit_debounce,
            max_runs: d.max_runs,
            setpoint_match_fraction: d.setpoint_match_fraction,
            clock: d.clock,
            mode: d.mode,
        }
    }
}

impl From<JsonAnalysis> for AnalysisConfig {
    fn from(json: JsonAnalysis) -> Self {
        Self {
            calibration_tolerance: json.calibration_tolerance,
            gradient_tolerance: json.gradient_tolerance,
            max_calibrations: json.max_calibrations,
            max_stable_points: json.max_stable_points,
            heater_resistance: json.heater_resistance,
            contact_area: json.contact_area,
            grease_correction: json.grease_correction,
            relative_error: json.relative_error,
            subsample_stride: json.subsample_stride,
            arming_debounce: json.arming_debounce,
            commit_debounce: json.commit_debounce,
            max_runs: json.max_runs,
            setpoint_match_fraction: json.setpoint_match_fraction,
            clock: json.clock,
            mode: json.mode,
        }
    }
}

/// Loads configuration overrides from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read, is not valid JSON, names an
/// unknown field, or yields an invalid configuration.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AnalysisConfig> {
    let file = File::open(path)?;
    let json: JsonConfig = serde_json::from_reader(BufReader::new(file))?;
    finish(json)
}

/// Parses configuration overrides from a JSON string.
///
/// # Errors
/// Returns an error if the string is not valid JSON, names an unknown
/// field, or yields an invalid configuration.
pub fn config_from_json(json: &str) -> Result<AnalysisConfig> {
    let json: JsonConfig = serde_json::from_str(json)?;
    finish(json)
}

fn finish(json: JsonConfig) -> Result<AnalysisConfig> {
    let config = AnalysisConfig::from(json.analysis);
    config.validate()?;
    Ok(config)
}
