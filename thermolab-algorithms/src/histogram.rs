//! Fixed-binning histograms for run and group summaries.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A uniform binning over `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Axis {
    /// Number of bins.
    pub bins: usize,
    /// Lower edge of the first bin.
    pub min: f64,
    /// Upper edge of the last bin.
    pub max: f64,
}

/// Where a value falls on an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinIndex {
    /// Below `min`.
    Underflow,
    /// Inside bin `n`.
    Bin(usize),
    /// At or above `max`, or NaN.
    Overflow,
}

impl Axis {
    /// Creates an axis.
    #[must_use]
    pub const fn new(bins: usize, min: f64, max: f64) -> Self {
        Self { bins, min, max }
    }

    /// Width of one bin.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.bins as f64
    }

    /// Centre of bin `bin`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_center(&self, bin: usize) -> f64 {
        self.min + (bin as f64 + 0.5) * self.bin_width()
    }

    /// Locates `value`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn locate(&self, value: f64) -> BinIndex {
        if value < self.min {
            return BinIndex::Underflow;
        }
        if value.is_nan() || value >= self.max || self.bins == 0 {
            return BinIndex::Overflow;
        }
        let bin = ((value - self.min) / self.bin_width()) as usize;
        // rounding right below max
        BinIndex::Bin(bin.min(self.bins - 1))
    }
}

/// One-dimensional counting histogram.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Histogram1D {
    /// Binning.
    pub axis: Axis,
    /// Counts per bin.
    pub counts: Vec<u64>,
    /// Values below the axis.
    pub underflow: u64,
    /// Values at or above the axis, or NaN.
    pub overflow: u64,
    sum: f64,
    sum_of_squares: f64,
}

impl Histogram1D {
    /// Creates an empty histogram.
    #[must_use]
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            counts: vec![0; axis.bins],
            underflow: 0,
            overflow: 0,
            sum: 0.0,
            sum_of_squares: 0.0,
        }
    }

    /// Counts one value.
    pub fn fill(&mut self, value: f64) {
        match self.axis.locate(value) {
            BinIndex::Underflow => self.underflow += 1,
            BinIndex::Overflow => self.overflow += 1,
            BinIndex::Bin(bin) => {
                self.counts[bin] += 1;
                self.sum += value;
                self.sum_of_squares += value * value;
            }
        }
    }

    /// Adds another histogram with the same binning.
    ///
    /// Returns false and leaves `self` untouched if the binnings differ.
    pub fn merge(&mut self, other: &Self) -> bool {
        if self.axis != other.axis {
            return false;
        }
        for (count, add) in self.counts.iter_mut().zip(&other.counts) {
            *count += add;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.sum += other.sum;
        self.sum_of_squares += other.sum_of_squares;
        true
    }

    /// Values inside the axis.
    #[must_use]
    pub fn entries(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Mean of the in-range values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Option<f64> {
        let n = self.entries();
        (n > 0).then(|| self.sum / n as f64)
    }

    /// Population standard deviation of the in-range values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let n = self.entries() as f64;
        Some((self.sum_of_squares / n - mean * mean).max(0.0).sqrt())
    }
}

/// Two-dimensional counting histogram, stored row by row along `y`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Histogram2D {
    /// Horizontal binning.
    pub x_axis: Axis,
    /// Vertical binning.
    pub y_axis: Axis,
    /// Counts, index `y_bin * x_axis.bins + x_bin`.
    pub counts: Vec<u64>,
    /// Pairs with either coordinate outside its axis.
    pub out_of_range: u64,
}

impl Histogram2D {
    /// Creates an empty histogram.
    #[must_use]
    pub fn new(x_axis: Axis, y_axis: Axis) -> Self {
        Self {
            x_axis,
            y_axis,
            counts: vec![0; x_axis.bins * y_axis.bins],
            out_of_range: 0,
        }
    }

    /// Counts one pair.
    pub fn fill(&mut self, x: f64, y: f64) {
        match (self.x_axis.locate(x), self.y_axis.locate(y)) {
            (BinIndex::Bin(xb), BinIndex::Bin(yb)) => {
                self.counts[yb * self.x_axis.bins + xb] += 1;
            }
            _ => self.out_of_range += 1,
        }
    }

    /// Count in one cell.
    #[must_use]
    pub fn count(&self, x_bin: usize, y_bin: usize) -> u64 {
        if x_bin >= self.x_axis.bins || y_bin >= self.y_axis.bins {
            return 0;
        }
        self.counts[y_bin * self.x_axis.bins + x_bin]
    }

    /// Pairs inside both axes.
    #[must_use]
    pub fn entries(&self) -> u64 {
        self.counts.iter().sum()
    }
}
