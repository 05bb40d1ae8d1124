//! Two-phase run analysis and batch processing.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use thermolab_core::config::SENSOR_COUNT;
use thermolab_core::{
    AnalysisConfig, AnalysisMode, CalibrationPoint, CalibrationSet, RecordSource, Result, Run,
    SensorRecord, StablePoint,
};

use crate::aggregate::{compare_runs, Comparison};
use crate::calibration::{CalibrationExtractor, CalibrationTable};
use crate::gradient::{GradientAccumulator, GradientFitResult, GradientFitter, RunGradientSummary};
use crate::histogram::{Axis, Histogram1D};
use crate::stable::{StablePointCollector, TraceSample};
use crate::stream::subsample;

/// Binning of block-difference histograms (°C).
pub const BLOCK_DIFFERENCE_AXIS: Axis = Axis::new(1000, -5.0, 10.0);

/// How far a run got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RunStatus {
    /// Both phases ran.
    Complete,
    /// Only the calibration phase was requested.
    CalibrationOnly,
    /// No calibration window was found; the analysis phase was skipped.
    Abandoned,
}

/// Everything derived from one run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunAnalysis {
    /// The run descriptor.
    pub run: Run,
    /// How far the run got.
    pub status: RunStatus,
    /// Calibration windows in detection order.
    pub calibration_points: Vec<CalibrationPoint>,
    /// Average offsets, if any window was found.
    pub calibration: Option<CalibrationSet>,
    /// Calibrated analysis records with neighbour deltas.
    pub trace: Vec<TraceSample>,
    /// Committed stable points.
    pub stable_points: Vec<StablePoint>,
    /// Gradient fits of the stable points that could be fitted.
    pub fits: Vec<GradientFitResult>,
    /// Run averages over `fits`.
    pub summary: Option<RunGradientSummary>,
    /// Block differences of `fits`.
    pub block_differences: Histogram1D,
}

impl RunAnalysis {
    fn new(run: Run, status: RunStatus) -> Self {
        Self {
            run,
            status,
            calibration_points: Vec::new(),
            calibration: None,
            trace: Vec::new(),
            stable_points: Vec::new(),
            fits: Vec::new(),
            summary: None,
            block_differences: Histogram1D::new(BLOCK_DIFFERENCE_AXIS),
        }
    }

    /// Calibration error bars per window, `|residual| * relative_error`.
    #[must_use]
    pub fn calibration_errors(&self, relative_error: f64) -> Vec<[f64; SENSOR_COUNT]> {
        self.calibration_points
            .iter()
            .map(|point| point.residuals().map(|r| (r * relative_error).abs()))
            .collect()
    }
}

/// Results of a batch.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BatchReport {
    /// Configuration the batch ran with.
    pub config: AnalysisConfig,
    /// Per-run results in run-list order.
    pub runs: Vec<RunAnalysis>,
    /// Cross-run comparison.
    pub comparison: Comparison,
}

impl BatchReport {
    /// Runs that reached the requested phase.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| r.status != RunStatus::Abandoned)
            .count()
    }

    /// Runs skipped for lack of a calibration.
    #[must_use]
    pub fn abandoned(&self) -> usize {
        self.runs.len() - self.completed()
    }
}

/// Phase one: finds the calibration windows of a run.
///
/// # Errors
/// Returns an error if `config` is invalid or the source cannot start a pass.
pub fn calibrate_run<S>(
    run: &Run,
    source: &S,
    config: &AnalysisConfig,
) -> Result<Vec<CalibrationPoint>>
where
    S: RecordSource + ?Sized,
{
    config.validate()?;
    let mut extractor = CalibrationExtractor::new(run.id, config);
    for record in subsample(source, run.permutation, config)? {
        extractor.observe(&record);
    }
    Ok(extractor.finish())
}

/// Phase two: collects and fits stable points using a run's calibration.
///
/// # Errors
/// Returns an error if `config` is invalid or the source cannot start a pass.
pub fn collect_stable_points<S>(
    run: &Run,
    source: &S,
    table: &CalibrationTable,
    config: &AnalysisConfig,
) -> Result<(Vec<StablePoint>, Vec<TraceSample>)>
where
    S: RecordSource + ?Sized,
{
    config.validate()?;
    let mut collector = StablePointCollector::new(run.id, config);
    for record in subsample(source, run.permutation, config)? {
        let (temperatures, _) = table.correct(&record.temperatures, record.working_temperature);
        collector.observe(&SensorRecord {
            temperatures,
            ..record
        });
    }
    Ok(collector.finish())
}

/// Runs the calibration and, in [`AnalysisMode::Full`], the analysis phase.
///
/// A run without calibration windows is returned as
/// [`RunStatus::Abandoned`] rather than as an error.
///
/// # Errors
/// Returns an error if `config` is invalid or the source cannot start a pass.
pub fn analyze_run<S>(run: &Run, source: &S, config: &AnalysisConfig) -> Result<RunAnalysis>
where
    S: RecordSource + ?Sized,
{
    let points = calibrate_run(run, source, config)?;
    log::info!(
        "run {} ({}): {} calibration windows",
        run.id,
        run.source,
        points.len()
    );

    let Some(table) = CalibrationTable::from_points(run.id, points, config) else {
        log::warn!(
            "run {} ({}): no calibration found, skipping analysis",
            run.id,
            run.source
        );
        return Ok(RunAnalysis::new(run.clone(), RunStatus::Abandoned));
    };

    if config.mode == AnalysisMode::Calibration {
        let mut analysis = RunAnalysis::new(run.clone(), RunStatus::CalibrationOnly);
        analysis.calibration = Some(table.average().clone());
        analysis.calibration_points = table.points().to_vec();
        return Ok(analysis);
    }

    let (stable_points, trace) = collect_stable_points(run, source, &table, config)?;

    let fitter = GradientFitter::new(config, run.broken_positions());
    let mut totals = GradientAccumulator::new();
    let mut analysis = RunAnalysis::new(run.clone(), RunStatus::Complete);
    for point in &stable_points {
        if let Some(fit) = fitter.fit(point) {
            totals.add(&fit);
            analysis.block_differences.fill(fit.block_difference);
            analysis.fits.push(fit);
        }
    }
    analysis.summary = totals.summary();

    match &analysis.summary {
        Some(summary) => log::info!(
            "run {}: {} stable points, average block difference {:.4} K, average gradient {:.3} K/m",
            run.id,
            summary.stable_points,
            summary.average_block_difference,
            summary.average_thermal_gradient
        ),
        None => log::info!("run {}: no stable points", run.id),
    }

    analysis.calibration = Some(table.average().clone());
    analysis.calibration_points = table.points().to_vec();
    analysis.stable_points = stable_points;
    analysis.trace = trace;
    Ok(analysis)
}

/// Analyzes every run in order, then compares them.
///
/// `open` provides the record source of a run. Runs past
/// `config.max_runs` are dropped with a warning.
///
/// # Errors
/// Returns the first error from `open` or from a record pass; the batch
/// stops there.
pub fn analyze_batch<S, E, F>(
    runs: &[Run],
    config: &AnalysisConfig,
    mut open: F,
) -> std::result::Result<BatchReport, E>
where
    S: RecordSource,
    E: From<thermolab_core::Error>,
    F: FnMut(&Run) -> std::result::Result<S, E>,
{
    config.validate()?;

    let accepted = if runs.len() > config.max_runs {
        log::warn!(
            "{} runs listed, only the first {} are analyzed",
            runs.len(),
            config.max_runs
        );
        &runs[..config.max_runs]
    } else {
        runs
    };

    let mut results = Vec::with_capacity(accepted.len());
    for run in accepted {
        let source = open(run)?;
        results.push(analyze_run(run, &source, config)?);
    }

    let comparison = compare_runs(&results);
    let report = BatchReport {
        config: config.clone(),
        runs: results,
        comparison,
    };
    log::info!(
        "analyzed {} runs, {} abandoned",
        report.runs.len(),
        report.abandoned()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermolab_core::{ClockFormat, RawRecord};

    fn flat(count: u32, temperature: f64, current: f64, working_temperature: f64) -> Vec<RawRecord> {
        (0..count)
            .map(|i| {
                RawRecord::new(i, [temperature; SENSOR_COUNT], current, working_temperature)
            })
            .collect()
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig::new()
            .with_subsample_stride(1)
            .with_clock(ClockFormat::Seconds)
    }

    #[test]
    fn test_heater_always_on_is_abandoned() {
        let records = flat(200, 20.0, 0.5, 20.0);
        let analysis = analyze_run(&Run::new(0, "a"), &records, &config()).unwrap();
        assert_eq!(analysis.status, RunStatus::Abandoned);
        assert!(analysis.calibration.is_none());
        assert!(analysis.fits.is_empty());
    }

    #[test]
    fn test_calibration_mode_stops_after_phase_one() {
        let records = flat(200, 20.0, 0.0, 20.0);
        let config = config().with_mode(AnalysisMode::Calibration);
        let analysis = analyze_run(&Run::new(0, "a"), &records, &config).unwrap();
        assert_eq!(analysis.status, RunStatus::CalibrationOnly);
        assert_eq!(analysis.calibration_points.len(), 1);
        assert!(analysis.trace.is_empty());
    }

    #[test]
    fn test_batch_drops_runs_over_capacity() {
        let mut config = config();
        config.max_runs = 2;
        let runs: Vec<Run> = (0..3).map(|id| Run::new(id, format!("run{id}"))).collect();
        let mut opened = Vec::new();
        let report = analyze_batch(&runs, &config, |run| {
            opened.push(run.id);
            Ok::<_, thermolab_core::Error>(flat(10, 20.0, 0.0, 20.0))
        })
        .unwrap();
        assert_eq!(opened, vec![0, 1]);
        assert_eq!(report.runs.len(), 2);
        assert_eq!(report.abandoned(), 2);
    }

    #[test]
    fn test_batch_stops_on_source_error() {
        let runs = vec![Run::new(0, "missing")];
        let result = analyze_batch::<Vec<RawRecord>, _, _>(&runs, &config(), |run| {
            Err(thermolab_core::Error::SourceError(run.source.clone()))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_calibration_errors() {
        let mut records = flat(200, 20.0, 0.0, 20.0);
        for r in &mut records {
            r.temperatures[3] = 20.5;
        }
        let config = config().with_mode(AnalysisMode::Calibration);
        let analysis = analyze_run(&Run::new(0, "a"), &records, &config).unwrap();
        let errors = analysis.calibration_errors(0.01);
        assert!((errors[0][3] - 0.005).abs() < 1e-12);
        assert!(errors[0][0].abs() < 1e-12);
    }

    #[test]
    fn test_zero_stride_is_an_error() {
        let records = flat(200, 20.0, 0.0, 20.0);
        let mut config = config();
        config.subsample_stride = 0;
        let result = analyze_run(&Run::new(0, "a"), &records, &config);
        assert!(matches!(result, Err(thermolab_core::Error::ConfigError(_))));
        assert!(calibrate_run(&Run::new(0, "a"), &records, &config).is_err());
    }
}
