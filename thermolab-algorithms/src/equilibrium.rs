//! Thermal equilibrium detection.

use thermolab_core::config::UNINFORMATIVE_POSITIONS;
use thermolab_core::Temperatures;

/// Returns true if every informative position moved by at most `tolerance`.
///
/// The top and bottom positions never take part. A NaN difference counts
/// as movement.
#[must_use]
pub fn is_stable(current: &Temperatures, previous: &Temperatures, tolerance: f64) -> bool {
    current
        .iter()
        .zip(previous.iter())
        .enumerate()
        .filter(|(position, _)| !UNINFORMATIVE_POSITIONS.contains(position))
        .all(|(_, (now, before))| (now - before).abs() <= tolerance)
}

/// Rolling equilibrium check over consecutive records.
///
/// The reference vector advances on every call, so each call compares the
/// given record against the one passed to the previous call.
#[derive(Debug, Clone, Default)]
pub struct EquilibriumDetector {
    previous: Option<Temperatures>,
}

impl EquilibriumDetector {
    /// Creates a detector without a reference record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares against the previous call and makes `current` the new reference.
    ///
    /// The first call has nothing to compare against and reports unstable.
    pub fn check(&mut self, current: &Temperatures, tolerance: f64) -> bool {
        let stable = self
            .previous
            .as_ref()
            .is_some_and(|previous| is_stable(current, previous, tolerance));
        if !stable {
            log::trace!("not in thermal equilibrium (tolerance {tolerance})");
        }
        self.previous = Some(*current);
        stable
    }

    /// Forgets the reference record.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermolab_core::SENSOR_COUNT;

    #[test]
    fn test_within_tolerance_is_stable() {
        let previous = [20.0; SENSOR_COUNT];
        let mut current = previous;
        current[4] += 0.0009;
        assert!(is_stable(&current, &previous, 0.001));
    }

    #[test]
    fn test_informative_jump_is_unstable() {
        let previous = [20.0; SENSOR_COUNT];
        for position in 1..SENSOR_COUNT - 1 {
            let mut current = previous;
            current[position] += 0.01;
            assert!(!is_stable(&current, &previous, 0.001), "position {position}");
        }
    }

    #[test]
    fn test_end_positions_are_ignored() {
        let previous = [20.0; SENSOR_COUNT];
        let mut current = previous;
        current[0] = 80.0;
        current[SENSOR_COUNT - 1] = -40.0;
        assert!(is_stable(&current, &previous, 0.001));
    }

    #[test]
    fn test_nan_is_unstable() {
        let previous = [20.0; SENSOR_COUNT];
        let mut current = previous;
        current[5] = f64::NAN;
        assert!(!is_stable(&current, &previous, 0.001));
    }

    #[test]
    fn test_detector_rolls_reference() {
        let mut detector = EquilibriumDetector::new();
        let a = [20.0; SENSOR_COUNT];
        let mut b = a;
        b[3] = 20.5;

        assert!(!detector.check(&a, 0.001));
        assert!(detector.check(&a, 0.001));
        assert!(!detector.check(&b, 0.001));
        // b is now the reference
        assert!(detector.check(&b, 0.001));

        detector.reset();
        assert!(!detector.check(&b, 0.001));
    }
}
