//! Straight-line least-squares fitting.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One sample of a fit: position, value and the value's uncertainty.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitSample {
    /// Independent variable.
    pub x: f64,
    /// Measured value.
    pub y: f64,
    /// Uncertainty of `y`.
    pub sigma: f64,
}

/// Result of a straight-line fit `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinearFit {
    /// Slope.
    pub slope: f64,
    /// Intercept at `x = 0`.
    pub intercept: f64,
    /// Weighted sum of squared residuals.
    pub chi_square: f64,
    /// Unweighted sum of squared residuals.
    pub residual_sum_of_squares: f64,
    /// Number of samples inside the fit range.
    pub samples: usize,
}

impl LinearFit {
    /// Evaluates the line at `x`.
    #[inline]
    #[must_use]
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Degrees of freedom of the fit.
    #[must_use]
    pub fn ndf(&self) -> usize {
        self.samples.saturating_sub(2)
    }

    /// Fits the samples whose `x` lies in `[range.0, range.1]`.
    ///
    /// Samples are weighted by `1 / sigma^2`. If any selected sample has a
    /// zero or non-finite sigma, all selected samples get unit weight.
    /// Returns `None` with fewer than two samples in range or when all of
    /// them share one `x`.
    #[must_use]
    pub fn fit(samples: &[FitSample], range: (f64, f64)) -> Option<Self> {
        let selected: Vec<&FitSample> = samples
            .iter()
            .filter(|s| s.x >= range.0 && s.x <= range.1)
            .collect();
        if selected.len() < 2 {
            return None;
        }

        let weighted = selected
            .iter()
            .all(|s| s.sigma.is_finite() && s.sigma > 0.0);
        let weight = |s: &FitSample| {
            if weighted {
                1.0 / (s.sigma * s.sigma)
            } else {
                1.0
            }
        };

        let (mut sw, mut swx, mut swy, mut swxx, mut swxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for s in &selected {
            let w = weight(s);
            sw += w;
            swx += w * s.x;
            swy += w * s.y;
            swxx += w * s.x * s.x;
            swxy += w * s.x * s.y;
        }

        let determinant = sw * swxx - swx * swx;
        if determinant.abs() <= f64::EPSILON * sw * swxx.abs().max(1.0) {
            return None;
        }
        let slope = (sw * swxy - swx * swy) / determinant;
        let intercept = (swxx * swy - swx * swxy) / determinant;

        let mut chi_square = 0.0;
        let mut residual_sum_of_squares = 0.0;
        for s in &selected {
            let r = s.y - (slope * s.x + intercept);
            chi_square += weight(s) * r * r;
            residual_sum_of_squares += r * r;
        }

        Some(Self {
            slope,
            intercept,
            chi_square,
            residual_sum_of_squares,
            samples: selected.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn samples(points: &[(f64, f64)], sigma: f64) -> Vec<FitSample> {
        points
            .iter()
            .map(|&(x, y)| FitSample { x, y, sigma })
            .collect()
    }

    #[test]
    fn test_exact_line() {
        let data = samples(&[(8.0, 21.0), (16.0, 22.0), (24.0, 23.0), (32.0, 24.0)], 0.2);
        let fit = LinearFit::fit(&data, (0.0, 40.1)).unwrap();
        assert_relative_eq!(fit.slope, 0.125, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 20.0, epsilon = 1e-10);
        assert_relative_eq!(fit.eval(40.0), 25.0, epsilon = 1e-10);
        assert!(fit.chi_square < 1e-12);
        assert_eq!(fit.samples, 4);
        assert_eq!(fit.ndf(), 2);
    }

    #[test]
    fn test_range_selects_samples() {
        let data = samples(&[(8.0, 1.0), (16.0, 2.0), (48.0, 100.0), (56.0, 200.0)], 1.0);
        let fit = LinearFit::fit(&data, (0.0, 40.1)).unwrap();
        assert_eq!(fit.samples, 2);
        assert_relative_eq!(fit.slope, 0.125, epsilon = 1e-12);
    }

    #[test]
    fn test_unweighted_least_squares() {
        // y = x with one outlier; unit weights since sigma is zero
        let data = samples(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 5.0)], 0.0);
        let fit = LinearFit::fit(&data, (0.0, 3.0)).unwrap();
        assert_relative_eq!(fit.slope, 1.6, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, -0.4, epsilon = 1e-12);
        assert_relative_eq!(fit.chi_square, fit.residual_sum_of_squares, epsilon = 1e-12);
    }

    #[test]
    fn test_deterministic() {
        let data = samples(&[(8.0, 20.3), (16.0, 21.9), (24.0, 23.2), (32.0, 23.8)], 0.2);
        let first = LinearFit::fit(&data, (0.0, 40.1)).unwrap();
        let second = LinearFit::fit(&data, (0.0, 40.1)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_degenerate() {
        let single = samples(&[(8.0, 1.0)], 1.0);
        assert!(LinearFit::fit(&single, (0.0, 40.0)).is_none());

        let vertical = samples(&[(8.0, 1.0), (8.0, 2.0)], 1.0);
        assert!(LinearFit::fit(&vertical, (0.0, 40.0)).is_none());
    }
}
