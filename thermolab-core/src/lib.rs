//! thermolab-core: Core types and configuration for thermal-conductivity rig analysis.
//!
//! This crate provides the data model shared by the analysis stages:
//! run descriptors, sensor records and their sources, the channel to
//! position permutation, the logger clock unwrap and the rig constants.
//!

pub mod calibration;
pub mod clock;
pub mod config;
pub mod error;
pub mod measurement;
pub mod permutation;
pub mod record;
pub mod run;

pub use calibration::{CalibrationPoint, CalibrationSet};
pub use clock::ClockUnwrapper;
pub use config::{AnalysisConfig, AnalysisMode, ClockFormat, SENSOR_COUNT};
pub use error::{Error, Result};
pub use measurement::StablePoint;
pub use permutation::SensorPermutation;
pub use record::{RawRecord, RecordSource, SensorRecord, Temperatures};
pub use run::{BrokenSensors, Run, RunId};
