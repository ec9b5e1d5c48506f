//! Zero-mean, unit-variance normalization of image stacks.
//!
//! Statistics are fitted once per volume at test time and once per loaded
//! file at training time. Whatever statistics normalized a patch must also
//! de-normalize its output.

use ndarray::{Array, ArrayBase, Data, Dimension};

use crate::error::{Result, TedError};
use crate::float_trait::TedFloat;

/// Standard deviations at or below this are treated as zero variance.
const NORMALIZATION_EPSILON: f64 = 1e-10;

/// Global mean and population standard deviation of a stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationParams<F: TedFloat> {
    pub mean: F,
    pub std: F,
}

impl<F: TedFloat> NormalizationParams<F> {
    /// Build parameters from known statistics.
    pub fn new(mean: F, std: F) -> Result<Self> {
        let params = Self { mean, std };
        params.check()?;
        Ok(params)
    }

    /// Fit mean and population standard deviation over every element.
    ///
    /// Accumulates in f64 so large f32 stacks do not drift.
    pub fn fit<S, D>(volume: &ArrayBase<S, D>) -> Result<Self>
    where
        S: Data<Elem = F>,
        D: Dimension,
    {
        let n = volume.len();
        if n == 0 {
            return Err(TedError::degenerate_statistics(
                "cannot fit statistics of an empty volume",
            ));
        }

        let mean = volume.iter().map(|&v| v.as_f64()).sum::<f64>() / n as f64;
        let variance = volume
            .iter()
            .map(|&v| {
                let d = v.as_f64() - mean;
                d * d
            })
            .sum::<f64>()
            / n as f64;

        let params = Self {
            mean: F::from_f64_c(mean),
            std: F::from_f64_c(variance.sqrt()),
        };
        params.check()?;
        Ok(params)
    }

    fn check(&self) -> Result<()> {
        if !self.mean.is_finite() {
            return Err(TedError::degenerate_statistics(format!(
                "mean is not finite ({:?})",
                self.mean
            )));
        }
        if !self.std.is_finite() || self.std.as_f64() <= NORMALIZATION_EPSILON {
            return Err(TedError::degenerate_statistics(format!(
                "standard deviation {:?} is zero or not finite",
                self.std
            )));
        }
        Ok(())
    }

    /// `(x - mean) / std`, returning a new array.
    pub fn apply<S, D>(&self, volume: &ArrayBase<S, D>) -> Array<F, D>
    where
        S: Data<Elem = F>,
        D: Dimension,
    {
        let (mean, std) = (self.mean, self.std);
        volume.mapv(|x| (x - mean) / std)
    }

    /// `x * std + mean`, returning a new array.
    pub fn invert<S, D>(&self, volume: &ArrayBase<S, D>) -> Array<F, D>
    where
        S: Data<Elem = F>,
        D: Dimension,
    {
        let (mean, std) = (self.mean, self.std);
        volume.mapv(|x| x * std + mean)
    }

    /// In-place variant of [`Self::invert`] for owned outputs.
    pub fn invert_inplace<D: Dimension>(&self, volume: &mut Array<F, D>) {
        let (mean, std) = (self.mean, self.std);
        volume.mapv_inplace(|x| x * std + mean);
    }
}
