//! Memory-mapped record files.
//!
//! A record file is CSV with one header line naming the columns:
//! `uTime`, `temperature0` to `temperature9`, `current1` and
//! `workingTemperature`. Columns may come in any order and extra columns are
//! ignored. Temperatures are read in raw channel order.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};
use memmap2::Mmap;
use thermolab_core::{ClockFormat, ClockUnwrapper, RawRecord, RecordSource, SENSOR_COUNT};

use crate::{Error, Result};

const TIME_COLUMN: &str = "uTime";
const TEMPERATURE_PREFIX: &str = "temperature";
const CURRENT_COLUMN: &str = "current1";
const WORKING_TEMPERATURE_COLUMN: &str = "workingTemperature";

/// Column indices resolved from the header.
#[derive(Debug, Clone)]
struct Columns {
    time: usize,
    temperatures: [usize; SENSOR_COUNT],
    current: usize,
    working_temperature: usize,
    width: usize,
}

impl Columns {
    fn from_header(header: &StringRecord) -> std::result::Result<Self, String> {
        if header.is_empty() {
            return Err("missing header".to_string());
        }
        let find = |name: &str| {
            header
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| format!("missing column '{name}'"))
        };

        let mut temperatures = [0; SENSOR_COUNT];
        for (channel, column) in temperatures.iter_mut().enumerate() {
            *column = find(&format!("{TEMPERATURE_PREFIX}{channel}"))?;
        }
        let time = find(TIME_COLUMN)?;
        let current = find(CURRENT_COLUMN)?;
        let working_temperature = find(WORKING_TEMPERATURE_COLUMN)?;
        let width = temperatures
            .iter()
            .chain([time, current, working_temperature].iter())
            .max()
            .map_or(0, |m| m + 1);

        Ok(Self {
            time,
            temperatures,
            current,
            working_temperature,
            width,
        })
    }

    fn parse_row(&self, row: &StringRecord) -> std::result::Result<RawRecord, String> {
        if row.len() < self.width {
            return Err(format!(
                "expected at least {} fields, found {}",
                self.width,
                row.len()
            ));
        }

        let number = |column: usize| {
            row[column]
                .parse::<f64>()
                .map_err(|e| format!("field {} '{}': {e}", column + 1, &row[column]))
        };

        let mut temperatures = [0.0; SENSOR_COUNT];
        for (t, &column) in temperatures.iter_mut().zip(self.temperatures.iter()) {
            *t = number(column)?;
        }
        Ok(RawRecord {
            time: parse_time(&row[self.time])?,
            temperatures,
            current: number(self.current)?,
            working_temperature: number(self.working_temperature)?,
        })
    }
}

/// Reads a time stamp, accepting integral floats such as `101500.0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_time(field: &str) -> std::result::Result<u32, String> {
    if let Ok(time) = field.parse::<u32>() {
        return Ok(time);
    }
    match field.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&value) => {
            Ok(value as u32)
        }
        _ => Err(format!("time stamp '{field}' is not an unsigned integer")),
    }
}

fn line_of(row: &StringRecord) -> u64 {
    row.position().map_or(0, csv::Position::line)
}

/// Overview of a record file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSummary {
    /// Data rows.
    pub rows: usize,
    /// First raw time stamp.
    pub first_time: u32,
    /// Last raw time stamp.
    pub last_time: u32,
    /// Elapsed seconds between the first and last row.
    pub duration: f64,
    /// Distinct working temperatures in first-seen order.
    pub setpoints: Vec<f64>,
    /// Smallest heater current.
    pub min_current: f64,
    /// Largest heater current.
    pub max_current: f64,
}

/// A memory-mapped record file.
///
/// The whole file is checked when it is opened, so every later pass yields
/// well-formed records only.
pub struct RecordFileReader {
    mmap: Arc<Mmap>,
    path: PathBuf,
    columns: Columns,
    rows: usize,
}

impl RecordFileReader {
    /// Opens and validates a record file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped, lacks
    /// a required column or has a malformed row.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };

        let path = path.as_ref().to_path_buf();
        let columns = {
            let mut reader = csv_reader(&mmap);
            let header = reader
                .headers()
                .map_err(|e| Error::InvalidFormat(format!("{}: {e}", path.display())))?;
            Columns::from_header(header)
                .map_err(|e| Error::InvalidFormat(format!("{}: {e}", path.display())))?
        };

        let mut reader = Self {
            mmap: Arc::new(mmap),
            path,
            columns,
            rows: 0,
        };
        reader.rows = reader.validate()?;
        log::debug!("{}: {} records", reader.path.display(), reader.rows);
        Ok(reader)
    }

    /// Checks every row, returning the number of rows.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] naming the first malformed row.
    pub fn validate(&self) -> Result<usize> {
        let mut rows = 0;
        for row in csv_reader(&self.mmap).into_records() {
            let row = row.map_err(|e| {
                let line = e.position().map_or(0, csv::Position::line);
                Error::InvalidFormat(format!("{} line {line}: {e}", self.path.display()))
            })?;
            self.columns.parse_row(&row).map_err(|e| {
                Error::InvalidFormat(format!(
                    "{} line {}: {e}",
                    self.path.display(),
                    line_of(&row)
                ))
            })?;
            rows += 1;
        }
        Ok(rows)
    }

    /// The file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Returns true if the file has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Iterates all rows once.
    #[must_use]
    pub fn iter(&self) -> CsvRecords<'_> {
        CsvRecords {
            rows: csv_reader(&self.mmap).into_records(),
            columns: &self.columns,
        }
    }

    /// Summarizes the file, unwrapping time stamps with `clock`.
    ///
    /// Returns `None` for a file without data rows.
    #[must_use]
    pub fn summary(&self, clock: ClockFormat) -> Option<FileSummary> {
        let mut unwrapper = ClockUnwrapper::new(clock);
        let mut summary: Option<FileSummary> = None;
        for record in self.iter() {
            let elapsed = unwrapper.unwrap(record.time);
            let s = summary.get_or_insert_with(|| FileSummary {
                rows: 0,
                first_time: record.time,
                last_time: record.time,
                duration: 0.0,
                setpoints: Vec::new(),
                min_current: record.current,
                max_current: record.current,
            });
            s.rows += 1;
            s.last_time = record.time;
            s.duration = elapsed;
            s.min_current = s.min_current.min(record.current);
            s.max_current = s.max_current.max(record.current);
            if !s.setpoints.contains(&record.working_temperature) {
                s.setpoints.push(record.working_temperature);
            }
        }
        summary
    }
}

fn csv_reader(data: &[u8]) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(data)
}

/// One pass over the rows of a record file.
pub struct CsvRecords<'a> {
    rows: StringRecordsIntoIter<&'a [u8]>,
    columns: &'a Columns,
}

impl Iterator for CsvRecords<'_> {
    type Item = RawRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let parsed = match self.rows.next()? {
                Ok(row) => self.columns.parse_row(&row),
                Err(e) => Err(e.to_string()),
            };
            match parsed {
                Ok(record) => return Some(record),
                Err(e) => log::warn!("skipping malformed record: {e}"),
            }
        }
    }
}

impl RecordSource for RecordFileReader {
    type Records<'a> = CsvRecords<'a>;

    fn records(&self) -> thermolab_core::Result<Self::Records<'_>> {
        Ok(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "uTime,temperature0,temperature1,temperature2,temperature3,temperature4,\
temperature5,temperature6,temperature7,temperature8,temperature9,current1,workingTemperature";

    fn write(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_records() {
        let file = write(&format!(
            "{HEADER}\n\
235959,20,21,22,23,24,25,26,27,28,29,0,20\n\
\n\
0,20.5,21,22,23,24,25,26,27,28,29,0.5,25\n"
        ));
        let reader = RecordFileReader::open(file.path()).unwrap();
        assert_eq!(reader.len(), 2);

        let records: Vec<RawRecord> = reader.records().unwrap().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].time, 235_959);
        assert!((records[1].temperatures[0] - 20.5).abs() < f64::EPSILON);
        assert!((records[1].temperatures[9] - 29.0).abs() < f64::EPSILON);
        assert!((records[1].current - 0.5).abs() < f64::EPSILON);

        // a second pass starts over
        assert_eq!(reader.records().unwrap().count(), 2);

        let summary = reader.summary(ClockFormat::Hms).unwrap();
        assert_eq!(summary.rows, 2);
        assert!((summary.duration - 1.0).abs() < f64::EPSILON);
        assert_eq!(summary.setpoints, vec![20.0, 25.0]);
        assert!((summary.max_current - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_columns_by_name() {
        let file = write(
            "workingTemperature,current1,temperature9,temperature8,temperature7,temperature6,\
temperature5,temperature4,temperature3,temperature2,temperature1,temperature0,uTime,extra\n\
20,0.1,9,8,7,6,5,4,3,2,1,0,12,x\n",
        );
        let reader = RecordFileReader::open(file.path()).unwrap();
        let record = reader.records().unwrap().next().unwrap();
        assert_eq!(record.time, 12);
        for (channel, t) in record.temperatures.iter().enumerate() {
            assert!((t - f64::from(u32::try_from(channel).unwrap())).abs() < f64::EPSILON);
        }
        assert!((record.working_temperature - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_byte_order_mark_and_quoted_fields() {
        let file = write(&format!(
            "\u{feff}{HEADER}\n\
100,\"20\",21,22,23,24,25,26,27,28,29, 0.25 ,\"20\"\n"
        ));
        let reader = RecordFileReader::open(file.path()).unwrap();
        let record = reader.iter().next().unwrap();
        assert_eq!(record.time, 100);
        assert!((record.temperatures[0] - 20.0).abs() < f64::EPSILON);
        assert!((record.current - 0.25).abs() < f64::EPSILON);
        assert!((record.working_temperature - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_column() {
        let file = write("uTime,temperature0,current1\n1,2,3\n");
        let err = RecordFileReader::open(file.path()).err().unwrap();
        assert!(matches!(err, Error::InvalidFormat(_)));
        let message = err.to_string();
        assert!(message.contains("missing column 'temperature1'"), "{message}");
        assert_eq!(message.matches("invalid file format").count(), 1, "{message}");
    }

    #[test]
    fn test_malformed_row_is_rejected_on_open() {
        let file = write(&format!("{HEADER}\n1,20,21,22,23,24,25,26,27,28,29,0,20\n2,20,21\n"));
        let err = RecordFileReader::open(file.path()).err().unwrap();
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn test_empty_file() {
        let file = write("");
        assert!(RecordFileReader::open(file.path()).is_err());

        let file = write(&format!("{HEADER}\n"));
        let reader = RecordFileReader::open(file.path()).unwrap();
        assert!(reader.is_empty());
        assert!(reader.summary(ClockFormat::Hms).is_none());
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("101500"), Ok(101_500));
        assert_eq!(parse_time("101500.0"), Ok(101_500));
        assert!(parse_time("-1").is_err());
        assert!(parse_time("1.5").is_err());
    }
}
