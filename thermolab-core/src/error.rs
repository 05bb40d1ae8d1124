//! Error types for thermolab-core.

use thiserror::Error;

/// Result type alias for thermolab operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for thermolab operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Permutation string does not map every physical position.
    #[error("invalid sensor permutation '{spec}': {reason}")]
    InvalidPermutation { spec: String, reason: String },

    /// Broken-sensor specification names something that is not a channel.
    #[error("invalid broken sensor specification '{0}'")]
    InvalidBrokenSensor(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The record source could not be opened or read.
    #[error("record source error: {0}")]
    SourceError(String),
}
