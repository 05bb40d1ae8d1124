//! thermolab-algorithms: Analysis stages for the heated-block rig.
//!
//! This crate provides the run analysis:
//! - **Equilibrium** - rolling stability check over consecutive records
//! - **Calibration** - heater-off window search, averaging and correction
//! - **Stable points** - heater-on windows collected after correction
//! - **Gradients** - two-segment linear fits and derived conductivity
//! - **Aggregation** - comparison series grouped by material and thickness
//!
#![warn(missing_docs)]

pub mod aggregate;
pub mod calibration;
pub mod equilibrium;
pub mod fit;
pub mod gradient;
pub mod histogram;
pub mod pipeline;
pub mod stable;
mod stream;

pub use aggregate::{
    compare_runs, Comparison, GroupComparison, MaterialComparison, SeriesPoint,
    ThicknessComparison,
};
pub use calibration::{
    average_calibrations, CalibrationExtractor, CalibrationTable, CorrectionSource, SearchState,
};
pub use equilibrium::{is_stable, EquilibriumDetector};
pub use fit::{FitSample, LinearFit};
pub use gradient::{
    GradientAccumulator, GradientFitResult, GradientFitter, PlotSample, RunGradientSummary,
};
pub use histogram::{Axis, Histogram1D, Histogram2D};
pub use pipeline::{
    analyze_batch, analyze_run, calibrate_run, collect_stable_points, BatchReport, RunAnalysis,
    RunStatus,
};
pub use stable::{neighbour_deltas, StablePointCollector, TraceSample};
pub use stream::{subsample, SubsampledRecords};

/// Horizontal plot shift for the `index`-th item drawn on a shared axis.
///
/// Items alternate right and left of their true position and move further
/// out every second item: `+step, -step, +2 step, -2 step, ...`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn alternating_offset(index: usize, step: f64) -> f64 {
    let distance = (index / 2 + 1) as f64 * step;
    if index % 2 == 0 {
        distance
    } else {
        -distance
    }
}

#[cfg(test)]
mod tests {
    use super::alternating_offset;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_alternating_offset() {
        let offsets: Vec<f64> = (0..5).map(|i| alternating_offset(i, 0.5)).collect();
        for (offset, expected) in offsets.iter().zip([0.5, -0.5, 1.0, -1.0, 1.5]) {
            assert_abs_diff_eq!(*offset, expected);
        }
    }
}
