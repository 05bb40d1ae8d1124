//! thermolab CLI: Command-line interface for rig analysis.
//!
//! Runs the calibration and gradient analysis over a run list and writes
//! the batch report.
#![allow(clippy::uninlined_format_args)]

use clap::{Args, Parser, Subcommand, ValueEnum};

use std::path::{Path, PathBuf};
use std::time::Instant;
use thermolab_algorithms::{analyze_batch, BatchReport};
use thermolab_core::{AnalysisConfig, AnalysisMode, ClockFormat};
use thermolab_io::{load_config, read_runlist, RecordFileReader, ResultWriter};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    ThermolabIo(#[from] thermolab_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] thermolab_core::Error),
}

/// Record time stamp encoding.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Clock {
    /// Packed HHMMSS wall-clock time
    Hms,
    /// Elapsed seconds
    Seconds,
}

impl From<Clock> for ClockFormat {
    fn from(clock: Clock) -> Self {
        match clock {
            Clock::Hms => ClockFormat::Hms,
            Clock::Seconds => ClockFormat::Seconds,
        }
    }
}

/// Calibration and thermal-conductivity analysis for the heated-block rig.
#[derive(Parser)]
#[command(name = "thermolab")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More log output (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Less log output (warnings only)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the batch commands.
#[derive(Args)]
struct BatchArgs {
    /// Run list file
    runlist: PathBuf,

    /// Output report path (JSON)
    #[arg(short, long)]
    output: PathBuf,

    /// JSON configuration overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Analyze every Nth raw record
    #[arg(long)]
    stride: Option<usize>,

    /// Time stamp encoding of the record files
    #[arg(long, value_enum)]
    clock: Option<Clock>,
}

#[derive(Subcommand)]
enum Commands {
    /// Calibrate and fit every run in a run list
    Analyze {
        #[command(flatten)]
        batch: BatchArgs,

        /// Also write one CSV row per stable point
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Find and average calibration windows only
    Calibrate {
        #[command(flatten)]
        batch: BatchArgs,

        /// Also write one CSV row per calibration window
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Show information about a record file
    Info {
        /// Input record file
        input: PathBuf,

        /// Time stamp encoding
        #[arg(long, value_enum, default_value = "hms")]
        clock: Clock,
    },
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn build_config(batch: &BatchArgs, mode: AnalysisMode) -> Result<AnalysisConfig> {
    let mut config = match &batch.config {
        Some(path) => load_config(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(stride) = batch.stride {
        config = config.with_subsample_stride(stride);
    }
    if let Some(clock) = batch.clock {
        config = config.with_clock(clock.into());
    }
    config = config.with_mode(mode);
    config.validate()?;
    Ok(config)
}

fn run_batch(batch: &BatchArgs, config: &AnalysisConfig) -> Result<BatchReport> {
    let list = read_runlist(&batch.runlist, config.max_runs)?;
    let report = analyze_batch(list.runs(), config, |run| {
        RecordFileReader::open(&run.source)
    })?;

    let mut writer = ResultWriter::create(&batch.output)?;
    writer.write_report_json(&report)?;
    log::info!("wrote {}", batch.output.display());
    Ok(report)
}

fn print_summary(report: &BatchReport, output: &Path) {
    for analysis in &report.runs {
        let windows = analysis.calibration_points.len();
        match &analysis.summary {
            Some(summary) => println!(
                "run {:>3} {:<8} {:>3}  {} calibrations, {} stable points, \
dT {:.4} K, gradient {:.2} K/m",
                analysis.run.id,
                analysis.run.material,
                analysis.run.thickness,
                windows,
                summary.stable_points,
                summary.average_block_difference,
                summary.average_thermal_gradient
            ),
            None => println!(
                "run {:>3} {:<8} {:>3}  {} calibrations, {:?}",
                analysis.run.id,
                analysis.run.material,
                analysis.run.thickness,
                windows,
                analysis.status
            ),
        }
    }
    println!(
        "{} runs, {} abandoned, report written to {}",
        report.runs.len(),
        report.abandoned(),
        output.display()
    );
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Analyze { batch, csv } => {
            let start = Instant::now();
            let config = build_config(&batch, AnalysisMode::Full)?;
            let report = run_batch(&batch, &config)?;

            if let Some(path) = csv {
                ResultWriter::create(&path)?.write_points_csv(&report)?;
                log::info!("wrote {}", path.display());
            }

            print_summary(&report, &batch.output);
            println!("Finished in {:.2}s", start.elapsed().as_secs_f64());
        }

        Commands::Calibrate { batch, csv } => {
            let config = build_config(&batch, AnalysisMode::Calibration)?;
            let report = run_batch(&batch, &config)?;

            if let Some(path) = csv {
                ResultWriter::create(&path)?.write_calibrations_csv(&report)?;
                log::info!("wrote {}", path.display());
            }

            for analysis in &report.runs {
                if let Some(set) = &analysis.calibration {
                    let means: Vec<String> = set.mean.iter().map(|m| format!("{m:+.4}")).collect();
                    println!(
                        "run {:>3} {} windows, mean offsets [{}]",
                        analysis.run.id,
                        set.windows,
                        means.join(", ")
                    );
                } else {
                    println!("run {:>3} no calibration found", analysis.run.id);
                }
            }
            print_summary(&report, &batch.output);
        }

        Commands::Info { input, clock } => {
            let reader = RecordFileReader::open(&input)?;

            println!("File: {}", input.display());
            println!("Records: {}", reader.len());

            if let Some(summary) = reader.summary(clock.into()) {
                println!(
                    "Time range: {} - {} ({:.0} s)",
                    summary.first_time, summary.last_time, summary.duration
                );
                let setpoints: Vec<String> =
                    summary.setpoints.iter().map(|t| format!("{t}")).collect();
                println!("Working temperatures: {}", setpoints.join(", "));
                println!(
                    "Current range: {} - {} A",
                    summary.min_current, summary.max_current
                );
            }
        }
    }

    Ok(())
}
