//! Float trait abstraction for f32/f64 support.
//!
//! Every volume, patch and gradient map in this crate is generic over
//! [`TedFloat`], so the stitching engine runs in either precision.

use num_traits::{Float, FromPrimitive, NumAssign};
use std::fmt::Debug;
use std::iter::Sum;

/// Trait alias for floating point sample types.
///
/// Combines the bounds needed by the tiling, normalization and gradient-map code:
/// - Basic float operations (Float, NumAssign)
/// - Conversion from primitive types (FromPrimitive)
/// - Iteration support (Sum)
/// - Thread-safety for rayon extraction (Send + Sync)
pub trait TedFloat:
    Float + FromPrimitive + NumAssign + Sum + Debug + Send + Sync + 'static
{
    /// Default divisor applied to raw temporal gradients (8-bit sample range).
    const GRADIENT_SCALE: Self;

    /// Create a value from an f64 constant.
    fn from_f64_c(val: f64) -> Self;

    /// Create a value from a usize constant.
    fn usize_as(val: usize) -> Self;

    /// Widen to f64 for accumulation.
    fn as_f64(self) -> f64;
}

impl TedFloat for f32 {
    const GRADIENT_SCALE: Self = 255.0;

    #[inline]
    fn from_f64_c(val: f64) -> Self {
        val as f32
    }

    #[inline]
    fn usize_as(val: usize) -> Self {
        val as f32
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl TedFloat for f64 {
    const GRADIENT_SCALE: Self = 255.0;

    #[inline]
    fn from_f64_c(val: f64) -> Self {
        val
    }

    #[inline]
    fn usize_as(val: usize) -> Self {
        val as f64
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
}
