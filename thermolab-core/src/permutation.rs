//! Mapping between raw data-source channels and physical sensor positions.
//!
//! A run declares its sensor order as a string of channel digits, read from
//! the top of the stack (position 0) to the bottom. The character at
//! position `p` names the raw channel that feeds position `p`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::SENSOR_COUNT;
use crate::error::{Error, Result};
use crate::record::Temperatures;

/// A validated bijection between channels and physical positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorPermutation {
    /// `channels[position]` is the raw channel read at that position.
    channels: [usize; SENSOR_COUNT],
    /// `positions[channel]` is the physical position of that channel.
    positions: [usize; SENSOR_COUNT],
}

impl Default for SensorPermutation {
    fn default() -> Self {
        Self::identity()
    }
}

impl SensorPermutation {
    /// Channel `i` sits at position `i`.
    #[must_use]
    pub fn identity() -> Self {
        let mut channels = [0; SENSOR_COUNT];
        for (position, channel) in channels.iter_mut().enumerate() {
            *channel = position;
        }
        Self {
            channels,
            positions: channels,
        }
    }

    /// Parses a permutation string such as `"0213456789"`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPermutation`] unless the string holds exactly
    /// one digit per sensor and every channel appears exactly once.
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidPermutation {
            spec: spec.to_string(),
            reason,
        };

        let digits: Vec<char> = spec.trim().chars().collect();
        if digits.len() != SENSOR_COUNT {
            return Err(invalid(format!(
                "expected {SENSOR_COUNT} channel digits, found {}",
                digits.len()
            )));
        }

        let mut channels = [0; SENSOR_COUNT];
        let mut positions = [usize::MAX; SENSOR_COUNT];
        for (position, digit) in digits.into_iter().enumerate() {
            let channel = digit
                .to_digit(10)
                .map(|d| d as usize)
                .ok_or_else(|| invalid(format!("'{digit}' is not a channel digit")))?;
            if channel >= SENSOR_COUNT {
                return Err(invalid(format!("channel {channel} out of range")));
            }
            if positions[channel] != usize::MAX {
                return Err(invalid(format!("channel {channel} appears twice")));
            }
            channels[position] = channel;
            positions[channel] = position;
        }

        Ok(Self {
            channels,
            positions,
        })
    }

    /// Raw channel feeding a physical position.
    #[inline]
    #[must_use]
    pub fn channel_at(&self, position: usize) -> Option<usize> {
        self.channels.get(position).copied()
    }

    /// Physical position fed by a raw channel, `None` if the channel is unknown.
    #[inline]
    #[must_use]
    pub fn position_of(&self, channel: usize) -> Option<usize> {
        self.positions.get(channel).copied()
    }

    /// Reindexes a channel-ordered vector into physical position order.
    #[must_use]
    pub fn reorder(&self, raw: &Temperatures) -> Temperatures {
        let mut ordered = [0.0; SENSOR_COUNT];
        for (slot, &channel) in ordered.iter_mut().zip(self.channels.iter()) {
            *slot = raw[channel];
        }
        ordered
    }

    /// The permutation written back as a digit string.
    #[must_use]
    pub fn to_spec(&self) -> String {
        self.channels
            .iter()
            .filter_map(|&c| char::from_digit(u32::try_from(c).ok()?, 10))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reorder_follows_wiring() {
        let perm = SensorPermutation::parse("9876543210").unwrap();
        let raw: Temperatures = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let ordered = perm.reorder(&raw);
        assert_eq!(ordered, [9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_bijection() {
        let perm = SensorPermutation::parse("3071925468").unwrap();
        for position in 0..SENSOR_COUNT {
            let channel = perm.channel_at(position).unwrap();
            assert_eq!(perm.position_of(channel), Some(position));
        }
        let raw: Temperatures = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0, 19.0];
        let ordered = perm.reorder(&raw);
        for channel in 0..SENSOR_COUNT {
            let position = perm.position_of(channel).unwrap();
            assert!((ordered[position] - raw[channel]).abs() < f64::EPSILON);
        }
        assert_eq!(perm.to_spec(), "3071925468");
    }

    #[test]
    fn test_unknown_channel() {
        let perm = SensorPermutation::identity();
        assert_eq!(perm.position_of(10), None);
        assert_eq!(perm.channel_at(42), None);
    }

    #[test]
    fn test_rejects_duplicate_channel() {
        let err = SensorPermutation::parse("0123456788").unwrap_err();
        assert!(err.to_string().contains("appears twice"), "{err}");
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(SensorPermutation::parse("012345678").is_err());
        assert!(SensorPermutation::parse("01234567890").is_err());
    }

    #[test]
    fn test_rejects_non_digit() {
        assert!(SensorPermutation::parse("01234x6789").is_err());
    }
}
