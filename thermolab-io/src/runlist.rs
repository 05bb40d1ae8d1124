//! Run-list parsing.
//!
//! One run per line, six comma-separated fields:
//!
//! ```text
//! # source,permutation,broken,thickness,material,comment
//! data/run01.csv,0123456789,-,2,Cu,first copper sample
//! ```
//!
//! Lines starting with `#` are comments. The comment field takes the rest
//! of the line, commas included.

use std::fs;
use std::path::Path;

use thermolab_core::{BrokenSensors, Run, SensorPermutation};

use crate::{Error, Result};

const FIELDS: usize = 6;

/// The runs of a run list and their group keys.
#[derive(Debug, Clone, Default)]
pub struct RunList {
    runs: Vec<Run>,
    materials: Vec<String>,
    thicknesses: Vec<i32>,
}

impl RunList {
    /// The accepted runs, in file order.
    #[must_use]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Number of accepted runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Returns true if no run was accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Distinct materials in first-seen order.
    #[must_use]
    pub fn materials(&self) -> &[String] {
        &self.materials
    }

    /// Distinct thicknesses in first-seen order.
    #[must_use]
    pub fn thicknesses(&self) -> &[i32] {
        &self.thicknesses
    }

    fn push(&mut self, run: Run) {
        if !self.materials.contains(&run.material) {
            self.materials.push(run.material.clone());
        }
        if !self.thicknesses.contains(&run.thickness) {
            self.thicknesses.push(run.thickness);
        }
        self.runs.push(run);
    }
}

/// Parses run-list text.
///
/// Relative sources are resolved against `base_dir` when given. Entries
/// past `max_runs` are dropped with a warning.
///
/// # Errors
/// Returns [`Error::InvalidFormat`] for a line with too few fields or a
/// non-integer thickness, and a core error for a bad permutation or
/// broken-sensor field.
pub fn parse_runlist(text: &str, base_dir: Option<&Path>, max_runs: usize) -> Result<RunList> {
    let mut list = RunList::default();
    let mut entries = 0;

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        entries += 1;
        if list.len() >= max_runs {
            continue;
        }

        let fields: Vec<&str> = line.splitn(FIELDS, ',').collect();
        if fields.len() < FIELDS - 1 {
            return Err(Error::InvalidFormat(format!(
                "run list line {}: expected {FIELDS} fields, found {}",
                number + 1,
                fields.len()
            )));
        }

        let source = match base_dir {
            Some(dir) if Path::new(fields[0].trim()).is_relative() => {
                dir.join(fields[0].trim()).to_string_lossy().into_owned()
            }
            _ => fields[0].trim().to_string(),
        };
        let permutation = SensorPermutation::parse(fields[1])?;
        let broken = BrokenSensors::parse(fields[2])?;
        let thickness = fields[3].trim().parse::<i32>().map_err(|e| {
            Error::InvalidFormat(format!(
                "run list line {}: thickness '{}': {e}",
                number + 1,
                fields[3].trim()
            ))
        })?;
        let material = fields[4].trim();
        let comment = fields.get(5).map_or("", |c| c.trim());

        let run = Run::new(list.len(), source)
            .with_permutation(permutation)
            .with_broken(broken)
            .with_group(material, thickness)
            .with_comment(comment);
        log::debug!(
            "run {}: {} ({} / {}), sensors {}, broken {:?}",
            run.id,
            run.source,
            run.material,
            run.thickness,
            run.permutation.to_spec(),
            run.broken.channels()
        );
        list.push(run);
    }

    if entries > max_runs {
        log::warn!(
            "run list has {entries} runs, only the first {max_runs} are kept"
        );
    }
    Ok(list)
}

/// Reads a run list from a file.
///
/// Relative sources are resolved against the run list's directory.
///
/// # Errors
/// Returns an error if the file cannot be read or fails to parse.
pub fn read_runlist<P: AsRef<Path>>(path: P, max_runs: usize) -> Result<RunList> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let list = parse_runlist(&text, path.parent(), max_runs)?;
    log::info!("read {} runs from {}", list.len(), path.display());
    Ok(list)
}
