//! Subsampled, reordered record passes.

use std::iter::StepBy;

use thermolab_core::{
    AnalysisConfig, ClockUnwrapper, RawRecord, RecordSource, Result, SensorPermutation,
    SensorRecord,
};

/// One forward pass over a run's records.
///
/// Takes every `stride`-th raw record, unwraps its clock and puts the
/// temperatures into physical position order.
pub struct SubsampledRecords<I> {
    inner: StepBy<I>,
    clock: ClockUnwrapper,
    permutation: SensorPermutation,
}

impl<I: Iterator<Item = RawRecord>> SubsampledRecords<I> {
    /// Wraps a raw record iterator.
    ///
    /// # Panics
    /// Panics if `config.subsample_stride` is zero; validated configs never are.
    pub fn new(records: I, permutation: SensorPermutation, config: &AnalysisConfig) -> Self {
        Self {
            inner: records.step_by(config.subsample_stride),
            clock: ClockUnwrapper::new(config.clock),
            permutation,
        }
    }
}

impl<I: Iterator<Item = RawRecord>> Iterator for SubsampledRecords<I> {
    type Item = SensorRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.inner.next()?;
        Some(SensorRecord {
            time: self.clock.unwrap(raw.time),
            temperatures: self.permutation.reorder(&raw.temperatures),
            current: raw.current,
            working_temperature: raw.working_temperature,
        })
    }
}

/// Starts a new subsampled pass over `source`.
///
/// # Errors
/// Returns an error if the source cannot start a pass.
pub fn subsample<'a, S>(
    source: &'a S,
    permutation: SensorPermutation,
    config: &AnalysisConfig,
) -> Result<SubsampledRecords<S::Records<'a>>>
where
    S: RecordSource + ?Sized,
{
    Ok(SubsampledRecords::new(source.records()?, permutation, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermolab_core::{ClockFormat, SENSOR_COUNT};

    #[test]
    fn test_stride_and_reorder() {
        let mut records = Vec::new();
        for i in 0..10u32 {
            let mut temperatures = [0.0; SENSOR_COUNT];
            for (channel, t) in temperatures.iter_mut().enumerate() {
                *t = f64::from(i) * 100.0 + channel as f64;
            }
            records.push(RawRecord::new(1000 + i, temperatures, 0.0, 20.0));
        }

        let config = AnalysisConfig::new()
            .with_subsample_stride(4)
            .with_clock(ClockFormat::Seconds);
        let permutation = SensorPermutation::parse("9012345678").unwrap();
        let pass: Vec<SensorRecord> = subsample(&records, permutation, &config)
            .unwrap()
            .collect();

        // raw records 0, 4 and 8
        assert_eq!(pass.len(), 3);
        assert!(pass[0].time.abs() < f64::EPSILON);
        assert!((pass[1].time - 4.0).abs() < f64::EPSILON);
        assert!((pass[2].temperatures[0] - 809.0).abs() < f64::EPSILON);
        assert!((pass[2].temperatures[1] - 800.0).abs() < f64::EPSILON);
    }
}
