//! Run descriptors.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::SENSOR_COUNT;
use crate::error::{Error, Result};
use crate::permutation::SensorPermutation;

/// Index of a run in its run list.
pub type RunId = usize;

/// Channels declared broken for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BrokenSensors {
    channels: Vec<usize>,
}

impl BrokenSensors {
    /// No broken channel.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// A single broken channel.
    #[must_use]
    pub fn single(channel: usize) -> Self {
        Self {
            channels: vec![channel],
        }
    }

    /// Parses a broken-sensor field.
    ///
    /// Every digit names a broken channel. An empty field, `-` or `none`
    /// means no sensor is broken.
    ///
    /// # Errors
    /// Returns [`Error::InvalidBrokenSensor`] for characters other than
    /// digits and whitespace.
    pub fn parse(spec: &str) -> Result<Self> {
        let trimmed = spec.trim();
        if trimmed.is_empty() || trimmed == "-" || trimmed.eq_ignore_ascii_case("none") {
            return Ok(Self::none());
        }

        let mut channels = Vec::new();
        for c in trimmed.chars().filter(|c| !c.is_whitespace()) {
            let channel = c
                .to_digit(10)
                .map(|d| d as usize)
                .filter(|&d| d < SENSOR_COUNT)
                .ok_or_else(|| Error::InvalidBrokenSensor(spec.to_string()))?;
            if !channels.contains(&channel) {
                channels.push(channel);
            }
        }
        channels.sort_unstable();
        Ok(Self { channels })
    }

    /// Returns true if no channel is broken.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// The broken raw channels, ascending.
    #[must_use]
    pub fn channels(&self) -> &[usize] {
        &self.channels
    }
}

/// One measurement session from the run list.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Run {
    /// Position in the run list.
    pub id: RunId,
    /// Where the records of this run come from.
    pub source: String,
    /// Channel to position mapping.
    pub permutation: SensorPermutation,
    /// Channels excluded from gradient fitting.
    pub broken: BrokenSensors,
    /// Interface layer thickness category.
    pub thickness: i32,
    /// Interface material label.
    pub material: String,
    /// Free-text comment.
    pub comment: String,
}

impl Run {
    /// Creates a run with identity sensor order and no broken sensor.
    #[must_use]
    pub fn new(id: RunId, source: impl Into<String>) -> Self {
        Self {
            id,
            source: source.into(),
            permutation: SensorPermutation::identity(),
            broken: BrokenSensors::none(),
            thickness: 0,
            material: String::new(),
            comment: String::new(),
        }
    }

    /// Sets the sensor permutation.
    #[must_use]
    pub fn with_permutation(mut self, permutation: SensorPermutation) -> Self {
        self.permutation = permutation;
        self
    }

    /// Sets the broken sensors.
    #[must_use]
    pub fn with_broken(mut self, broken: BrokenSensors) -> Self {
        self.broken = broken;
        self
    }

    /// Sets the material and thickness group of the run.
    #[must_use]
    pub fn with_group(mut self, material: impl Into<String>, thickness: i32) -> Self {
        self.material = material.into();
        self.thickness = thickness;
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Physical positions of the broken channels.
    #[must_use]
    pub fn broken_positions(&self) -> Vec<usize> {
        self.broken
            .channels()
            .iter()
            .filter_map(|&channel| self.permutation.position_of(channel))
            .collect()
    }
}
