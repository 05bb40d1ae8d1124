//! Axial temperature gradients and thermal conductivity.
//!
//! Positions 1 to 8 sit at fixed axial distances along the two aluminium
//! blocks, with the interface at 40 mm. Each block gets its own straight
//! line; both lines are extrapolated to the interface, and the gap between
//! them is the temperature drop across the interface layer. The mean slope
//! and the heater power give the conductivity of the blocks.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use thermolab_core::config::{
    AXIAL_POSITIONS_MM, FAR_FIT_RANGE_MM, FIRST_AXIAL_POSITION, INTERFACE_POSITION_MM,
    NEAR_FIT_RANGE_MM,
};
use thermolab_core::{AnalysisConfig, RunId, StablePoint};

use crate::alternating_offset;
use crate::fit::{FitSample, LinearFit};

/// Horizontal spacing between stable points in gradient plots (mm).
const GRADIENT_PLOT_STEP_MM: f64 = 0.5;

/// Horizontal error bar of an axial sample (mm).
const AXIAL_POSITION_ERROR_MM: f64 = 1.0;

const MM_PER_M: f64 = 1000.0;

/// One point of a gradient plot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlotSample {
    /// Physical sensor position.
    pub position: usize,
    /// Axial distance with plot jitter applied (mm).
    pub x: f64,
    /// Temperature (°C).
    pub y: f64,
    /// Horizontal error (mm).
    pub x_error: f64,
    /// Vertical error (°C).
    pub y_error: f64,
}

/// Gradient fit of one stable point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GradientFitResult {
    /// Run of the stable point.
    pub run: RunId,
    /// Index of the stable point within the run.
    pub index: usize,
    /// Time of the stable point (s).
    pub time: f64,
    /// Bath setpoint at the stable point (°C).
    pub working_temperature: f64,
    /// Heater current (A).
    pub current: f64,
    /// Fit over the block below the interface.
    pub near: LinearFit,
    /// Fit over the block above the interface.
    pub far: LinearFit,
    /// Lower block extrapolated to the interface, grease corrected (°C).
    pub low_temperature: f64,
    /// Upper block extrapolated to the interface, grease corrected (°C).
    pub high_temperature: f64,
    /// `high - low` at the interface (°C).
    pub block_difference: f64,
    /// Mean of `high` and `low` (°C).
    pub measurement_temperature: f64,
    /// Mean of both slopes (°C/mm).
    pub mean_slope: f64,
    /// Mean slope in K/m.
    pub thermal_gradient: f64,
    /// Conductivity of the blocks (W/(m K)).
    pub conductivity: f64,
    /// Interface thermal resistance, `block_difference / power` (K/W).
    pub thermal_resistance: f64,
    /// Samples as drawn, excluded positions removed.
    pub samples: Vec<PlotSample>,
}

/// Fits stable points of one run.
#[derive(Debug, Clone)]
pub struct GradientFitter {
    resistance: f64,
    contact_area: f64,
    grease_correction: f64,
    relative_error: f64,
    excluded_positions: Vec<usize>,
}

impl GradientFitter {
    /// Creates a fitter that skips the given physical positions.
    #[must_use]
    pub fn new(config: &AnalysisConfig, excluded_positions: Vec<usize>) -> Self {
        Self {
            resistance: config.heater_resistance,
            contact_area: config.contact_area,
            grease_correction: config.grease_correction,
            relative_error: config.relative_error,
            excluded_positions,
        }
    }

    /// Axial samples of a stable point, excluded positions removed.
    #[must_use]
    pub fn samples(&self, point: &StablePoint) -> Vec<(usize, FitSample)> {
        AXIAL_POSITIONS_MM
            .iter()
            .enumerate()
            .map(|(k, &x)| (FIRST_AXIAL_POSITION + k, x))
            .filter(|(position, _)| !self.excluded_positions.contains(position))
            .map(|(position, x)| {
                let y = point.temperatures[position];
                let sigma = (y * self.relative_error).abs();
                (position, FitSample { x, y, sigma })
            })
            .collect()
    }

    /// Fits both blocks of a stable point.
    ///
    /// Returns `None` when either block has fewer than two usable samples.
    #[must_use]
    pub fn fit(&self, point: &StablePoint) -> Option<GradientFitResult> {
        let samples = self.samples(point);
        let fit_samples: Vec<FitSample> = samples.iter().map(|(_, s)| *s).collect();

        let Some(near) = LinearFit::fit(&fit_samples, NEAR_FIT_RANGE_MM) else {
            log::warn!(
                "run {}: stable point {} has too few samples below the interface",
                point.run,
                point.index
            );
            return None;
        };
        let Some(far) = LinearFit::fit(&fit_samples, FAR_FIT_RANGE_MM) else {
            log::warn!(
                "run {}: stable point {} has too few samples above the interface",
                point.run,
                point.index
            );
            return None;
        };

        let low_temperature = near.eval(INTERFACE_POSITION_MM) + self.grease_correction / 2.0;
        let high_temperature = far.eval(INTERFACE_POSITION_MM) - self.grease_correction / 2.0;
        let block_difference = high_temperature - low_temperature;
        let measurement_temperature = (high_temperature + low_temperature) / 2.0;
        let mean_slope = (near.slope + far.slope) / 2.0;
        let thermal_gradient = mean_slope * MM_PER_M;
        let power = point.heater_power(self.resistance);
        let conductivity = power / (thermal_gradient * self.contact_area);
        let thermal_resistance = block_difference / power;

        let jitter = alternating_offset(point.index, GRADIENT_PLOT_STEP_MM);
        let plot = samples
            .iter()
            .map(|&(position, s)| PlotSample {
                position,
                x: s.x + jitter,
                y: s.y,
                x_error: AXIAL_POSITION_ERROR_MM,
                y_error: (s.y * self.relative_error).abs(),
            })
            .collect();

        log::debug!(
            "run {}: point {} block difference {:.4} K, conductivity {:.1} W/(m K) at {} °C",
            point.run,
            point.index,
            block_difference,
            conductivity,
            point.working_temperature
        );

        Some(GradientFitResult {
            run: point.run,
            index: point.index,
            time: point.time,
            working_temperature: point.working_temperature,
            current: point.current,
            near,
            far,
            low_temperature,
            high_temperature,
            block_difference,
            measurement_temperature,
            mean_slope,
            thermal_gradient,
            conductivity,
            thermal_resistance,
            samples: plot,
        })
    }
}

/// Run-level averages over all fitted stable points.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunGradientSummary {
    /// Number of fitted stable points.
    pub stable_points: usize,
    /// Mean block difference (°C).
    pub average_block_difference: f64,
    /// Mean of every segment slope (°C/mm).
    pub average_gradient: f64,
    /// Mean gradient in K/m.
    pub average_thermal_gradient: f64,
}

/// Running totals for one run.
#[derive(Debug, Clone, Default)]
pub struct GradientAccumulator {
    block_difference_sum: f64,
    slope_sum: f64,
    points: usize,
}

impl GradientAccumulator {
    /// Creates empty totals.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one fitted stable point.
    pub fn add(&mut self, fit: &GradientFitResult) {
        self.block_difference_sum += fit.block_difference;
        self.slope_sum += fit.near.slope + fit.far.slope;
        self.points += 1;
    }

    /// Averages, or `None` if nothing was added.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn summary(&self) -> Option<RunGradientSummary> {
        if self.points == 0 {
            return None;
        }
        let n = self.points as f64;
        let average_gradient = self.slope_sum / (2.0 * n);
        Some(RunGradientSummary {
            stable_points: self.points,
            average_block_difference: self.block_difference_sum / n,
            average_gradient,
            average_thermal_gradient: average_gradient * MM_PER_M,
        })
    }
}
