#![allow(clippy::uninlined_format_args)]
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use thermolab_algorithms::{analyze_batch, RunStatus};
use thermolab_core::config::{AXIAL_POSITIONS_MM, FIRST_AXIAL_POSITION, INTERFACE_POSITION_MM};
use thermolab_core::{AnalysisConfig, Temperatures, SENSOR_COUNT};
use thermolab_io::{read_runlist, RecordFileReader, ResultWriter};

const STRIDE: u32 = 50;
const SLOPE: f64 = 10.0 / 64.0;
const HEADER: &str = "uTime,temperature0,temperature1,temperature2,temperature3,temperature4,\
temperature5,temperature6,temperature7,temperature8,temperature9,current1,workingTemperature";

fn profile(shift: f64) -> Temperatures {
    let mut temperatures = [25.0; SENSOR_COUNT];
    for (k, &x) in AXIAL_POSITIONS_MM.iter().enumerate() {
        let base = if x > INTERFACE_POSITION_MM { 20.0 } else { 30.0 };
        temperatures[FIRST_AXIAL_POSITION + k] = base + shift + SLOPE * (x - INTERFACE_POSITION_MM);
    }
    temperatures
}

/// Cold plateau then three stable heated windows, one row per second from 10:00:00.
/// `swap` exchanges channels 0 and 1 as a miswired logger would.
fn record_file(swap: bool) -> String {
    let mut ticks: Vec<(Temperatures, f64)> = vec![([20.0; SENSOR_COUNT], 0.0); 60];
    for window in 0..3 {
        let stable = profile(0.2 * f64::from(window));
        ticks.push((stable.map(|t| t + 1.0), 0.5));
        ticks.extend(std::iter::repeat((stable, 0.5)).take(4));
    }

    let mut text = format!("{HEADER}\n");
    let mut second = 10 * 3600;
    for (mut temperatures, current) in ticks {
        if swap {
            temperatures.swap(0, 1);
        }
        for _ in 0..STRIDE {
            let hms = (second / 3600) * 10_000 + (second % 3600 / 60) * 100 + second % 60;
            write!(text, "{hms}").unwrap();
            for t in temperatures {
                write!(text, ",{t}").unwrap();
            }
            writeln!(text, ",{current},20").unwrap();
            second += 1;
        }
    }
    text
}

fn write_batch(dir: &Path) {
    fs::create_dir(dir.join("data")).unwrap();
    fs::write(dir.join("data/cu-a.csv"), record_file(false)).unwrap();
    fs::write(dir.join("data/cu-b.csv"), record_file(true)).unwrap();
    fs::write(
        dir.join("runs.txt"),
        "# source,permutation,broken,thickness,material,comment\n\
data/cu-a.csv,0123456789,-,2,Cu,reference\n\
data/cu-b.csv,1023456789,-,2,Cu,channels 0 and 1 swapped\n",
    )
    .unwrap();
}

#[test]
fn test_runlist_to_report() {
    let dir = tempfile::tempdir().unwrap();
    write_batch(dir.path());

    let config = AnalysisConfig::default();
    let list = read_runlist(dir.path().join("runs.txt"), config.max_runs).unwrap();
    assert_eq!(list.len(), 2);

    let report = analyze_batch(list.runs(), &config, |run| {
        RecordFileReader::open(&run.source)
    })
    .unwrap();

    assert_eq!(report.completed(), 2);
    for analysis in &report.runs {
        assert_eq!(analysis.status, RunStatus::Complete);
        assert_eq!(
            analysis.fits.len(),
            3,
            "run {} has {} fits",
            analysis.run.id,
            analysis.fits.len()
        );
    }
    // the permutation undoes the swapped wiring
    for (a, b) in report.runs[0].fits.iter().zip(&report.runs[1].fits) {
        assert_relative_eq!(a.block_difference, -10.0, epsilon = 1e-6);
        assert_relative_eq!(a.block_difference, b.block_difference, epsilon = 1e-9);
        assert_relative_eq!(a.mean_slope, b.mean_slope, epsilon = 1e-9);
    }
    assert_eq!(report.comparison.group("Cu", 2).unwrap().points(), 6);

    let json_path = dir.path().join("report.json");
    let csv_path = dir.path().join("points.csv");
    ResultWriter::create(&json_path)
        .unwrap()
        .write_report_json(&report)
        .unwrap();
    ResultWriter::create(&csv_path)
        .unwrap()
        .write_points_csv(&report)
        .unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["runs"].as_array().unwrap().len(), 2);
    assert_eq!(json["runs"][1]["run"]["comment"], "channels 0 and 1 swapped");
    assert_eq!(json["runs"][0]["status"], "complete");

    let csv = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 7);
    assert!(csv.lines().nth(4).unwrap().starts_with("1,0,"));
}

#[test]
fn test_missing_record_file_stops_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    write_batch(dir.path());
    fs::remove_file(dir.path().join("data/cu-b.csv")).unwrap();

    let config = AnalysisConfig::default();
    let list = read_runlist(dir.path().join("runs.txt"), config.max_runs).unwrap();
    let result = analyze_batch(list.runs(), &config, |run| {
        RecordFileReader::open(&run.source)
    });
    assert!(matches!(result, Err(thermolab_io::Error::Io(_))));
}

#[test]
fn test_file_summary() {
    let dir = tempfile::tempdir().unwrap();
    write_batch(dir.path());

    let reader = RecordFileReader::open(dir.path().join("data/cu-a.csv")).unwrap();
    assert_eq!(reader.len(), 75 * 50);
    let summary = reader.summary(thermolab_core::ClockFormat::Hms).unwrap();
    assert_eq!(summary.first_time, 100_000);
    assert_relative_eq!(summary.duration, f64::from(75 * 50 - 1));
    assert_eq!(summary.setpoints, vec![20.0]);
    assert_relative_eq!(summary.max_current, 0.5);
}
