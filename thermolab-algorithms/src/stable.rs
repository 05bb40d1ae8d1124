//! Stable-point collection during the heated phase.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use thermolab_core::{AnalysisConfig, RunId, SensorRecord, StablePoint, Temperatures, SENSOR_COUNT};

use crate::equilibrium::EquilibriumDetector;

/// Differences between neighbouring positions.
///
/// `delta[p] = t[p] - t[p - 1]`, with position 0 wrapping to the last one.
#[must_use]
pub fn neighbour_deltas(temperatures: &Temperatures) -> Temperatures {
    let mut deltas = [0.0; SENSOR_COUNT];
    for (position, delta) in deltas.iter_mut().enumerate() {
        let before = if position == 0 {
            SENSOR_COUNT - 1
        } else {
            position - 1
        };
        *delta = temperatures[position] - temperatures[before];
    }
    deltas
}

/// One calibrated analysis record, kept for time plots.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceSample {
    /// Elapsed time (s).
    pub time: f64,
    /// Calibrated temperatures by position (°C).
    pub temperatures: Temperatures,
    /// Neighbour deltas of `temperatures` (°C).
    pub deltas: Temperatures,
}

/// Collects stable points from calibrated records.
///
/// A point is committed when the record is stable, the heater is on and more
/// than `commit_debounce` stable records were seen since the last commit.
#[derive(Debug, Clone)]
pub struct StablePointCollector {
    run: RunId,
    tolerance: f64,
    max_stable_points: usize,
    commit_debounce: usize,
    detector: EquilibriumDetector,
    stable_count: usize,
    dropped: usize,
    points: Vec<StablePoint>,
    trace: Vec<TraceSample>,
}

impl StablePointCollector {
    /// Creates a collector for one run.
    #[must_use]
    pub fn new(run: RunId, config: &AnalysisConfig) -> Self {
        Self {
            run,
            tolerance: config.gradient_tolerance,
            max_stable_points: config.max_stable_points,
            commit_debounce: config.commit_debounce,
            detector: EquilibriumDetector::new(),
            stable_count: 0,
            dropped: 0,
            points: Vec::with_capacity(config.max_stable_points),
            trace: Vec::new(),
        }
    }

    /// Points committed so far.
    #[must_use]
    pub fn points(&self) -> &[StablePoint] {
        &self.points
    }

    /// Points that qualified after the capacity was reached.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Feeds the next calibrated record.
    ///
    /// Returns the point committed by this record, if any.
    pub fn observe(&mut self, record: &SensorRecord) -> Option<&StablePoint> {
        self.trace.push(TraceSample {
            time: record.time,
            temperatures: record.temperatures,
            deltas: neighbour_deltas(&record.temperatures),
        });

        let stable = self.detector.check(&record.temperatures, self.tolerance);
        if stable {
            self.stable_count += 1;
        }
        if !stable || self.stable_count <= self.commit_debounce || record.current <= 0.0 {
            return None;
        }
        self.stable_count = 0;

        if self.points.len() >= self.max_stable_points {
            if self.dropped == 0 {
                log::warn!(
                    "run {}: more than {} stable points, dropping the rest",
                    self.run,
                    self.max_stable_points
                );
            }
            self.dropped += 1;
            return None;
        }

        let index = self.points.len();
        self.points.push(StablePoint {
            run: self.run,
            index,
            temperatures: record.temperatures,
            working_temperature: record.working_temperature,
            current: record.current,
            time: record.time,
        });
        log::debug!(
            "run {}: stable point {} at {:.0} s, {} A",
            self.run,
            index,
            record.time,
            record.current
        );
        self.points.last()
    }

    /// Ends the pass, returning the points and the trace.
    #[must_use]
    pub fn finish(self) -> (Vec<StablePoint>, Vec<TraceSample>) {
        if self.dropped > 0 {
            log::warn!(
                "run {}: dropped {} stable points over capacity",
                self.run,
                self.dropped
            );
        }
        (self.points, self.trace)
    }
}
