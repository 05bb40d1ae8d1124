//! thermolab-io: File I/O for thermolab.
//!
//! This crate reads run lists, memory-mapped record files via memmap2 and
//! JSON configuration overrides, and writes batch results as JSON or CSV.
//!

pub mod config;
mod error;
mod reader;
pub mod runlist;
mod writer;

pub use config::{config_from_json, load_config};
pub use error::{Error, Result};
pub use reader::{CsvRecords, FileSummary, RecordFileReader};
pub use runlist::{parse_runlist, read_runlist, RunList};
pub use writer::ResultWriter;
