//! Sensor offset calibration.
//!
//! During a calibration pass the bath is stepped through a few setpoints
//! with the heater off. After each bath change the extractor waits for the
//! sensors to settle and records one window per setpoint. The windows are
//! then averaged into a per-sensor offset, and the analysis pass subtracts
//! either the matching setpoint's offset or that average from every record.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use thermolab_core::{
    AnalysisConfig, CalibrationPoint, CalibrationSet, RunId, SensorRecord, Temperatures,
    SENSOR_COUNT,
};

use crate::alternating_offset;
use crate::equilibrium::EquilibriumDetector;

/// Horizontal spacing between calibration windows in plots (sensor index units).
const CALIBRATION_PLOT_STEP: f64 = 0.1;

/// Search state of the calibration extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SearchState {
    /// Waiting for a bath temperature change.
    Idle,
    /// Bath changed; waiting for a stable heater-off window.
    Armed,
    /// All calibration slots are filled.
    Done,
}

/// Finds calibration windows in one subsampled pass.
#[derive(Debug, Clone)]
pub struct CalibrationExtractor {
    run: RunId,
    tolerance: f64,
    max_calibrations: usize,
    arming_debounce: usize,
    state: SearchState,
    since_arming: usize,
    previous_working_temperature: Option<f64>,
    overflow_armed: bool,
    dropped: usize,
    detector: EquilibriumDetector,
    points: Vec<CalibrationPoint>,
}

impl CalibrationExtractor {
    /// Creates an extractor for one run.
    #[must_use]
    pub fn new(run: RunId, config: &AnalysisConfig) -> Self {
        Self {
            run,
            tolerance: config.calibration_tolerance,
            max_calibrations: config.max_calibrations,
            arming_debounce: config.arming_debounce,
            state: SearchState::Idle,
            since_arming: 0,
            previous_working_temperature: None,
            overflow_armed: false,
            dropped: 0,
            detector: EquilibriumDetector::new(),
            points: Vec::with_capacity(config.max_calibrations),
        }
    }

    /// Current search state.
    #[must_use]
    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Windows found so far.
    #[must_use]
    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    /// Qualifying windows seen after every slot was filled.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Feeds the next subsampled record.
    ///
    /// Returns the window committed by this record, if any.
    // bath setpoints and the heater-off current are logged as exact values
    #[allow(clippy::float_cmp)]
    pub fn observe(&mut self, record: &SensorRecord) -> Option<&CalibrationPoint> {
        self.since_arming += 1;

        let bath_changed = self
            .previous_working_temperature
            .is_none_or(|previous| previous != record.working_temperature);
        if bath_changed && self.since_arming > self.arming_debounce {
            log::debug!(
                "run {}: searching for calibration at {:.0} s, bath {} °C, {} records since last search",
                self.run,
                record.time,
                record.working_temperature,
                self.since_arming
            );
            // one search per setpoint change
            self.previous_working_temperature = Some(record.working_temperature);
            self.since_arming = 0;
            match self.state {
                SearchState::Done => self.overflow_armed = true,
                _ => self.state = SearchState::Armed,
            }
        }

        let armed = match self.state {
            SearchState::Armed => true,
            SearchState::Done => self.overflow_armed,
            SearchState::Idle => false,
        };
        if !armed || record.current != 0.0 {
            return None;
        }
        if !self.detector.check(&record.temperatures, self.tolerance) {
            return None;
        }

        if self.state == SearchState::Done {
            if self.dropped == 0 {
                log::warn!(
                    "run {}: more than {} calibration windows, dropping the rest",
                    self.run,
                    self.max_calibrations
                );
            }
            self.overflow_armed = false;
            self.dropped += 1;
            return None;
        }

        let index = self.points.len();
        self.points.push(CalibrationPoint {
            run: self.run,
            index,
            working_temperature: record.working_temperature,
            temperatures: record.temperatures,
            time: record.time,
            plot_offset: alternating_offset(index, CALIBRATION_PLOT_STEP),
        });
        self.state = if self.points.len() >= self.max_calibrations {
            SearchState::Done
        } else {
            SearchState::Idle
        };
        log::debug!(
            "run {}: calibration {} at {:.0} s, bath {} °C",
            self.run,
            index + 1,
            record.time,
            record.working_temperature
        );
        self.points.last()
    }

    /// Ends the pass and returns every window found, in detection order.
    #[must_use]
    pub fn finish(self) -> Vec<CalibrationPoint> {
        if self.dropped > 0 {
            log::warn!(
                "run {}: dropped {} calibration windows over capacity",
                self.run,
                self.dropped
            );
        }
        self.points
    }
}

/// Averages the per-window offsets of a run.
///
/// Returns `None` when no window was found. The spread is the population
/// standard deviation of the per-window offsets around the mean.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_calibrations(run: RunId, points: &[CalibrationPoint]) -> Option<CalibrationSet> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;

    let mut mean = [0.0; SENSOR_COUNT];
    let mut std_dev = [0.0; SENSOR_COUNT];
    for position in 0..SENSOR_COUNT {
        mean[position] = points.iter().map(|p| p.residual(position)).sum::<f64>() / n;
        let variance = points
            .iter()
            .map(|p| {
                let d = mean[position] - p.residual(position);
                d * d
            })
            .sum::<f64>()
            / n;
        std_dev[position] = variance.sqrt();
    }

    Some(CalibrationSet {
        run,
        windows: points.len(),
        mean,
        std_dev,
    })
}

/// Which offset corrected a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CorrectionSource {
    /// The window with this calibration index matched the bath setpoint.
    Setpoint(usize),
    /// No setpoint matched; the run average was used.
    Average,
}

/// Applies a run's calibration to live records.
#[derive(Debug, Clone)]
pub struct CalibrationTable {
    points: Vec<CalibrationPoint>,
    average: CalibrationSet,
    match_fraction: f64,
}

impl CalibrationTable {
    /// Builds the table from the windows of a run and their average.
    #[must_use]
    pub fn new(
        points: Vec<CalibrationPoint>,
        average: CalibrationSet,
        match_fraction: f64,
    ) -> Self {
        Self {
            points,
            average,
            match_fraction,
        }
    }

    /// Builds the table, averaging the windows itself.
    ///
    /// Returns `None` when there are no windows.
    #[must_use]
    pub fn from_points(
        run: RunId,
        points: Vec<CalibrationPoint>,
        config: &AnalysisConfig,
    ) -> Option<Self> {
        let average = average_calibrations(run, &points)?;
        Some(Self::new(points, average, config.setpoint_match_fraction))
    }

    /// The run average.
    #[must_use]
    pub fn average(&self) -> &CalibrationSet {
        &self.average
    }

    /// The windows, in calibration index order.
    #[must_use]
    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    /// Picks the offset source for a bath setpoint.
    ///
    /// The first window whose setpoint lies within the relative band around
    /// `working_temperature` wins.
    #[must_use]
    pub fn select(&self, working_temperature: f64) -> CorrectionSource {
        let band = working_temperature.abs() * self.match_fraction;
        let low = working_temperature - band;
        let high = working_temperature + band;
        self.points
            .iter()
            .find(|p| p.working_temperature >= low && p.working_temperature <= high)
            .map_or(CorrectionSource::Average, |p| CorrectionSource::Setpoint(p.index))
    }

    /// Corrects every position with one offset source.
    #[must_use]
    pub fn correct(
        &self,
        temperatures: &Temperatures,
        working_temperature: f64,
    ) -> (Temperatures, CorrectionSource) {
        let source = self.select(working_temperature);
        let offsets = match source {
            CorrectionSource::Setpoint(index) => self
                .points
                .iter()
                .find(|p| p.index == index)
                .map_or(self.average.mean, CalibrationPoint::residuals),
            CorrectionSource::Average => self.average.mean,
        };

        let mut corrected = *temperatures;
        for (t, offset) in corrected.iter_mut().zip(offsets.iter()) {
            *t -= offset;
        }
        (corrected, source)
    }
}
