//! Cross-run comparison by material and thickness.
//!
//! Runs are grouped by their declared material label and thickness
//! category, both matched exactly. Every material and every thickness seen
//! in the batch gets an entry, in first-seen order, and every pairing of the
//! two gets a group even when no run matches it; such groups stay empty.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use thermolab_core::{RunId, SENSOR_COUNT};

use crate::histogram::{Axis, Histogram1D, Histogram2D};
use crate::pipeline::{RunAnalysis, BLOCK_DIFFERENCE_AXIS};

/// Working temperature axis of the per-sensor calibration histograms (°C).
pub const CALIBRATION_TEMPERATURE_AXIS: Axis = Axis::new(30, 0.0, 30.0);

/// Offset axis of the per-sensor calibration histograms (°C).
pub const CALIBRATION_OFFSET_AXIS: Axis = Axis::new(150, -5.0, 10.0);

/// Sensor axis of the calibration-by-sensor histograms.
#[allow(clippy::cast_precision_loss)]
pub const SENSOR_AXIS: Axis = Axis::new(SENSOR_COUNT, -0.5, SENSOR_COUNT as f64 - 0.5);

/// Offset axis of the calibration-by-sensor histograms (°C).
pub const SENSOR_OFFSET_AXIS: Axis = Axis::new(100, -10.0, 10.0);

/// Measurement temperature axis of the material histograms (°C).
pub const MEASUREMENT_TEMPERATURE_AXIS: Axis = Axis::new(100, 0.0, 30.0);

/// One point of a comparison series.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SeriesPoint {
    /// Run the point came from.
    pub run: RunId,
    /// Stable point index within the run.
    pub index: usize,
    /// Horizontal value.
    pub x: f64,
    /// Vertical value.
    pub y: f64,
}

/// Calibration offsets of every window, binned per sensor position.
fn sensor_offsets() -> Histogram2D {
    Histogram2D::new(SENSOR_AXIS, SENSOR_OFFSET_AXIS)
}

#[allow(clippy::cast_precision_loss)]
fn fill_sensor_offsets(histogram: &mut Histogram2D, analysis: &RunAnalysis) {
    for point in &analysis.calibration_points {
        for (position, residual) in point.residuals().iter().enumerate() {
            histogram.fill(position as f64, *residual);
        }
    }
}

/// Comparison across runs of one thickness.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThicknessComparison {
    /// Thickness category.
    pub thickness: i32,
    /// Calibration offsets by sensor position.
    pub calibration_by_sensor: Histogram2D,
    /// Block differences of every stable point.
    pub block_differences: Histogram1D,
}

/// Comparison across runs of one material.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaterialComparison {
    /// Material label.
    pub material: String,
    /// Calibration offsets by sensor position.
    pub calibration_by_sensor: Histogram2D,
    /// Block differences of every stable point.
    pub block_differences: Histogram1D,
    /// Block difference against measurement temperature.
    pub block_difference_vs_temperature: Histogram2D,
    /// `(measurement temperature, block difference)` per stable point.
    pub difference_vs_temperature: Vec<SeriesPoint>,
    /// `(mean slope, block difference)` per stable point.
    pub difference_vs_slope: Vec<SeriesPoint>,
    /// `(measurement temperature, conductivity)` per stable point.
    pub conductivity_vs_temperature: Vec<SeriesPoint>,
}

/// Runs sharing one material and one thickness.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupComparison {
    /// Material label.
    pub material: String,
    /// Thickness category.
    pub thickness: i32,
    /// Matching runs.
    pub runs: Vec<RunId>,
    /// `(measurement temperature, block difference)` per stable point.
    pub difference_vs_temperature: Vec<SeriesPoint>,
    /// `(mean slope, block difference)` per stable point.
    pub difference_vs_slope: Vec<SeriesPoint>,
    /// `(measurement temperature, conductivity)` per stable point.
    pub conductivity_vs_temperature: Vec<SeriesPoint>,
}

impl GroupComparison {
    /// Number of stable points in the group.
    #[must_use]
    pub fn points(&self) -> usize {
        self.difference_vs_temperature.len()
    }
}

/// Everything compared across a batch.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Comparison {
    /// Per sensor position: offset against working temperature.
    pub calibration_by_temperature: Vec<Histogram2D>,
    /// Per thickness, first-seen order.
    pub thicknesses: Vec<ThicknessComparison>,
    /// Per material, first-seen order.
    pub materials: Vec<MaterialComparison>,
    /// Per material and thickness pair.
    pub groups: Vec<GroupComparison>,
}

impl Comparison {
    /// The group of one material and thickness.
    #[must_use]
    pub fn group(&self, material: &str, thickness: i32) -> Option<&GroupComparison> {
        self.groups
            .iter()
            .find(|g| g.material == material && g.thickness == thickness)
    }

    /// The comparison of one material.
    #[must_use]
    pub fn material(&self, material: &str) -> Option<&MaterialComparison> {
        self.materials.iter().find(|m| m.material == material)
    }

    /// The comparison of one thickness.
    #[must_use]
    pub fn thickness(&self, thickness: i32) -> Option<&ThicknessComparison> {
        self.thicknesses.iter().find(|t| t.thickness == thickness)
    }
}

/// Compares finished runs.
#[must_use]
pub fn compare_runs(runs: &[RunAnalysis]) -> Comparison {
    let mut materials: Vec<&str> = Vec::new();
    let mut thicknesses: Vec<i32> = Vec::new();
    for analysis in runs {
        if !materials.contains(&analysis.run.material.as_str()) {
            materials.push(&analysis.run.material);
        }
        if !thicknesses.contains(&analysis.run.thickness) {
            thicknesses.push(analysis.run.thickness);
        }
    }

    let mut comparison = Comparison {
        calibration_by_temperature: (0..SENSOR_COUNT)
            .map(|_| Histogram2D::new(CALIBRATION_TEMPERATURE_AXIS, CALIBRATION_OFFSET_AXIS))
            .collect(),
        ..Comparison::default()
    };

    for &thickness in &thicknesses {
        let mut entry = ThicknessComparison {
            thickness,
            calibration_by_sensor: sensor_offsets(),
            block_differences: Histogram1D::new(BLOCK_DIFFERENCE_AXIS),
        };
        for analysis in runs.iter().filter(|a| a.run.thickness == thickness) {
            fill_sensor_offsets(&mut entry.calibration_by_sensor, analysis);
            entry.block_differences.merge(&analysis.block_differences);
        }
        comparison.thicknesses.push(entry);
    }

    for &material in &materials {
        let mut entry = MaterialComparison {
            material: material.to_string(),
            calibration_by_sensor: sensor_offsets(),
            block_differences: Histogram1D::new(BLOCK_DIFFERENCE_AXIS),
            block_difference_vs_temperature: Histogram2D::new(
                MEASUREMENT_TEMPERATURE_AXIS,
                BLOCK_DIFFERENCE_AXIS,
            ),
            difference_vs_temperature: Vec::new(),
            difference_vs_slope: Vec::new(),
            conductivity_vs_temperature: Vec::new(),
        };

        for &thickness in &thicknesses {
            let mut group = GroupComparison {
                material: material.to_string(),
                thickness,
                runs: Vec::new(),
                difference_vs_temperature: Vec::new(),
                difference_vs_slope: Vec::new(),
                conductivity_vs_temperature: Vec::new(),
            };

            for analysis in runs
                .iter()
                .filter(|a| a.run.material == material && a.run.thickness == thickness)
            {
                group.runs.push(analysis.run.id);
                fill_sensor_offsets(&mut entry.calibration_by_sensor, analysis);

                for point in &analysis.calibration_points {
                    for (position, residual) in point.residuals().iter().enumerate() {
                        comparison.calibration_by_temperature[position]
                            .fill(point.working_temperature, *residual);
                    }
                }

                for fit in &analysis.fits {
                    entry.block_differences.fill(fit.block_difference);
                    entry
                        .block_difference_vs_temperature
                        .fill(fit.measurement_temperature, fit.block_difference);

                    let at = |x: f64, y: f64| SeriesPoint {
                        run: fit.run,
                        index: fit.index,
                        x,
                        y,
                    };
                    group
                        .difference_vs_temperature
                        .push(at(fit.measurement_temperature, fit.block_difference));
                    group
                        .difference_vs_slope
                        .push(at(fit.mean_slope, fit.block_difference));
                    group
                        .conductivity_vs_temperature
                        .push(at(fit.measurement_temperature, fit.conductivity));
                }
            }

            entry
                .difference_vs_temperature
                .extend_from_slice(&group.difference_vs_temperature);
            entry
                .difference_vs_slope
                .extend_from_slice(&group.difference_vs_slope);
            entry
                .conductivity_vs_temperature
                .extend_from_slice(&group.conductivity_vs_temperature);

            log::debug!(
                "group {material}/{thickness}: {} runs, {} stable points",
                group.runs.len(),
                group.points()
            );
            comparison.groups.push(group);
        }

        comparison.materials.push(entry);
    }

    comparison
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermolab_core::{AnalysisConfig, StablePoint};

    use crate::gradient::GradientFitter;
    use crate::pipeline::RunStatus;
    use thermolab_core::config::{AXIAL_POSITIONS_MM, FIRST_AXIAL_POSITION};
    use thermolab_core::{CalibrationPoint, Run};

    fn analysis(id: RunId, material: &str, thickness: i32, stable: usize) -> RunAnalysis {
        let fitter = GradientFitter::new(&AnalysisConfig::default(), Vec::new());
        let mut block_differences = Histogram1D::new(BLOCK_DIFFERENCE_AXIS);
        let fits = (0..stable)
            .filter_map(|index| {
                let mut temperatures = [20.0; SENSOR_COUNT];
                for (k, &x) in AXIAL_POSITIONS_MM.iter().enumerate() {
                    temperatures[FIRST_AXIAL_POSITION + k] = 15.0 + 0.1 * x;
                }
                fitter.fit(&StablePoint {
                    run: id,
                    index,
                    temperatures,
                    working_temperature: 15.0,
                    current: 0.5,
                    time: 0.0,
                })
            })
            .inspect(|fit| block_differences.fill(fit.block_difference))
            .collect();

        RunAnalysis {
            run: Run::new(id, format!("run{id}")).with_group(material, thickness),
            status: RunStatus::Complete,
            calibration_points: vec![CalibrationPoint {
                run: id,
                index: 0,
                working_temperature: 15.0,
                temperatures: [15.55; SENSOR_COUNT],
                time: 0.0,
                plot_offset: 0.1,
            }],
            calibration: None,
            trace: Vec::new(),
            stable_points: Vec::new(),
            fits,
            summary: None,
            block_differences,
        }
    }

    #[test]
    fn test_groups_by_exact_keys() {
        let runs = vec![
            analysis(0, "Cu", 2, 3),
            analysis(1, "Cu", 1, 2),
            analysis(2, "Al", 2, 4),
            analysis(3, "cu", 2, 1),
        ];
        let comparison = compare_runs(&runs);

        assert_eq!(comparison.materials.len(), 3);
        assert_eq!(comparison.thicknesses.len(), 2);
        assert_eq!(comparison.groups.len(), 6);

        let cu2 = comparison.group("Cu", 2).unwrap();
        assert_eq!(cu2.runs, vec![0]);
        assert_eq!(cu2.points(), 3);

        let cu = comparison.material("Cu").unwrap();
        assert_eq!(cu.difference_vs_temperature.len(), 5);
        assert_eq!(cu.block_differences.entries(), 5);
        assert_eq!(cu.block_difference_vs_temperature.entries(), 5);

        let two = comparison.thickness(2).unwrap();
        assert_eq!(two.block_differences.entries(), 8);
    }

    #[test]
    fn test_missing_pair_is_empty() {
        let runs = vec![analysis(0, "Cu", 2, 3), analysis(1, "Al", 1, 2)];
        let comparison = compare_runs(&runs);
        let empty = comparison.group("Cu", 1).unwrap();
        assert!(empty.runs.is_empty());
        assert_eq!(empty.points(), 0);
        assert!(comparison.group("Ag", 1).is_none());
    }

    #[test]
    fn test_calibration_histograms() {
        let runs = vec![analysis(0, "Cu", 2, 0), analysis(1, "Al", 2, 0)];
        let comparison = compare_runs(&runs);

        // offset 0.55 at 15 °C for every sensor
        assert_eq!(comparison.calibration_by_temperature.len(), SENSOR_COUNT);
        for histogram in &comparison.calibration_by_temperature {
            assert_eq!(histogram.count(15, 55), 2);
        }
        let cu = comparison.material("Cu").unwrap();
        assert_eq!(cu.calibration_by_sensor.entries(), 10);
        let two = comparison.thickness(2).unwrap();
        assert_eq!(two.calibration_by_sensor.entries(), 20);
        assert_eq!(two.calibration_by_sensor.count(3, 52), 2);
    }

    #[test]
    fn test_no_runs() {
        let comparison = compare_runs(&[]);
        assert!(comparison.groups.is_empty());
        assert_eq!(comparison.calibration_by_temperature.len(), SENSOR_COUNT);
    }
}
