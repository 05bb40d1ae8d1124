//! Result writers.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use thermolab_algorithms::BatchReport;
use thermolab_core::SENSOR_COUNT;

use crate::Result;

/// Writer for batch results.
pub struct ResultWriter {
    writer: BufWriter<File>,
}

impl ResultWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes the whole report as pretty-printed JSON.
    ///
    /// Non-finite numbers, such as the conductivity of a flat profile, are
    /// written as `null`.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn write_report_json(&mut self, report: &BatchReport) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, report)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes one CSV row per fitted stable point.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn write_points_csv(&mut self, report: &BatchReport) -> Result<()> {
        writeln!(
            self.writer,
            "run,index,time,working_temperature,current,block_difference,\
measurement_temperature,mean_slope,conductivity"
        )?;

        for fit in report.runs.iter().flat_map(|r| &r.fits) {
            writeln!(
                self.writer,
                "{},{},{},{},{},{},{},{},{}",
                fit.run,
                fit.index,
                fit.time,
                fit.working_temperature,
                fit.current,
                fit.block_difference,
                fit.measurement_temperature,
                fit.mean_slope,
                fit.conductivity
            )?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes one CSV row per calibration window with its per-position
    /// residuals.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn write_calibrations_csv(&mut self, report: &BatchReport) -> Result<()> {
        write!(self.writer, "run,index,time,working_temperature")?;
        for position in 0..SENSOR_COUNT {
            write!(self.writer, ",residual{position}")?;
        }
        writeln!(self.writer)?;

        for point in report.runs.iter().flat_map(|r| &r.calibration_points) {
            write!(
                self.writer,
                "{},{},{},{}",
                point.run, point.index, point.time, point.working_temperature
            )?;
            for residual in point.residuals() {
                write!(self.writer, ",{residual}")?;
            }
            writeln!(self.writer)?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
