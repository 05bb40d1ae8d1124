//! Continuous time from the logger's wall-clock stamps.
//!
//! The data logger stores the time of day packed as a decimal `HHMMSS`
//! integer, so `17:59:59` is followed by `18:00:00` (a jump of 4041 in the
//! raw value) and the value falls back to zero at midnight. The unwrapper
//! turns that into seconds elapsed since the first record of a pass.

use crate::config::ClockFormat;

const SECONDS_PER_DAY: i64 = 86_400;

/// Splits a packed `HHMMSS` value into seconds of the day.
#[inline]
#[must_use]
pub fn hms_to_seconds(hms: u32) -> u32 {
    let hours = hms / 10_000;
    let minutes = (hms / 100) % 100;
    let seconds = hms % 100;
    hours * 3600 + minutes * 60 + seconds
}

/// Stateful converter from raw record stamps to elapsed seconds.
///
/// Create one per pass over a record stream.
#[derive(Debug, Clone)]
pub struct ClockUnwrapper {
    format: ClockFormat,
    reference: Option<i64>,
    last_hour: u32,
    day_offset: i64,
}

impl ClockUnwrapper {
    /// Creates an unwrapper for the given stamp encoding.
    #[must_use]
    pub fn new(format: ClockFormat) -> Self {
        Self {
            format,
            reference: None,
            last_hour: 0,
            day_offset: 0,
        }
    }

    /// Converts the next stamp of the stream into elapsed seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn unwrap(&mut self, raw: u32) -> f64 {
        let absolute = match self.format {
            ClockFormat::Seconds => i64::from(raw),
            ClockFormat::Hms => {
                let hour = raw / 10_000;
                if self.reference.is_some() && hour < self.last_hour {
                    // back to 00h: a new day started
                    self.day_offset += SECONDS_PER_DAY;
                }
                self.last_hour = hour;
                self.day_offset + i64::from(hms_to_seconds(raw))
            }
        };

        let reference = *self.reference.get_or_insert(absolute);
        (absolute - reference) as f64
    }
}
