//! Stitching run configuration.
//!
//! Holds the patch geometry and the few policy knobs the extraction and
//! stitching stages need. Defaults match the reference test-time settings:
//! 21-frame patches of 128×128 pixels, stepped by one frame and ten pixels.

use crate::error::{Result, TedError};
use crate::float_trait::TedFloat;

// =============================================================================
// Constants
// =============================================================================

/// Default patch extent (time, height, width)
const DEFAULT_PATCH_SIZE: [usize; 3] = [21, 128, 128];

/// Default stride between patch placements (time, height, width)
const DEFAULT_PATCH_INTERVAL: [usize; 3] = [1, 10, 10];

/// Default number of patches handed to the denoiser per call
const DEFAULT_BATCH_SIZE: usize = 180;

/// Environment override for the batch size
pub(crate) const BATCH_SIZE_ENV: &str = "TED_BATCH_SIZE";

/// Environment switch for per-volume timing summaries
pub(crate) const PROFILE_TIMING_ENV: &str = "TED_PROFILE_TIMING";

// =============================================================================
// Types
// =============================================================================

/// Configuration for tiling a volume into patches and stitching them back.
///
/// Use `Default::default()` for the standard settings.
#[derive(Debug, Clone, PartialEq)]
pub struct StitchConfig<F: TedFloat> {
    /// Patch extent per axis (T, H, W). Default: [21, 128, 128]
    pub patch_size: [usize; 3],
    /// Stride per axis (T, H, W). Default: [1, 10, 10]
    pub patch_interval: [usize; 3],
    /// Divisor applied to raw temporal gradients. Default: 255.0
    pub gradient_scale: F,
    /// Patches per denoiser call. Default: 180
    pub batch_size: usize,
}

impl<F: TedFloat> Default for StitchConfig<F> {
    fn default() -> Self {
        Self {
            patch_size: DEFAULT_PATCH_SIZE,
            patch_interval: DEFAULT_PATCH_INTERVAL,
            gradient_scale: F::GRADIENT_SCALE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl<F: TedFloat> StitchConfig<F> {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from untrusted patch size / interval slices.
    ///
    /// Both slices must hold exactly one entry per axis.
    pub fn from_slices(patch_size: &[usize], patch_interval: &[usize]) -> Result<Self> {
        let config = Self {
            patch_size: axis_triple(patch_size, "patch_size")?,
            patch_interval: axis_triple(patch_interval, "patch_interval")?,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration parameters.
    pub fn validate(&self) -> Result<()> {
        validate_geometry(&self.patch_size, &self.patch_interval)?;
        if self.batch_size == 0 {
            return Err(TedError::invalid_configuration("batch_size must be > 0"));
        }
        if self.gradient_scale <= F::zero() || !self.gradient_scale.is_finite() {
            return Err(TedError::invalid_configuration(
                "gradient_scale must be finite and > 0",
            ));
        }
        if self.patch_interval[0] > 1 {
            tracing::warn!(
                interval = self.patch_interval[0],
                "time interval > 1 leaves frames between patch centres unwritten"
            );
        }
        Ok(())
    }

    /// Validate the configuration against a concrete volume shape.
    pub fn validate_for_shape(&self, shape: (usize, usize, usize)) -> Result<()> {
        self.validate()?;
        check_fits(shape, &self.patch_size)
    }
}

/// Convert a slice into one value per axis.
pub(crate) fn axis_triple(values: &[usize], name: &str) -> Result<[usize; 3]> {
    match values {
        [t, h, w] => Ok([*t, *h, *w]),
        _ => Err(TedError::invalid_configuration(format!(
            "length of {} must be 3, got {}",
            name,
            values.len()
        ))),
    }
}

/// Check size/interval relations that do not depend on the volume.
pub(crate) fn validate_geometry(patch_size: &[usize; 3], patch_interval: &[usize; 3]) -> Result<()> {
    for axis in 0..3 {
        if patch_size[axis] == 0 {
            return Err(TedError::invalid_configuration(format!(
                "patch_size[{}] must be > 0",
                axis
            )));
        }
        if patch_interval[axis] == 0 {
            return Err(TedError::invalid_configuration(format!(
                "patch_interval[{}] must be > 0",
                axis
            )));
        }
        if patch_interval[axis] > patch_size[axis] {
            return Err(TedError::invalid_configuration(format!(
                "patch_interval[{}] = {} exceeds patch_size[{}] = {}",
                axis, patch_interval[axis], axis, patch_size[axis]
            )));
        }
    }
    Ok(())
}

/// Fail if the patch is larger than the volume on any axis.
pub(crate) fn check_fits(shape: (usize, usize, usize), patch_size: &[usize; 3]) -> Result<()> {
    let dims = [shape.0, shape.1, shape.2];
    if dims.iter().zip(patch_size.iter()).any(|(d, p)| d < p) {
        return Err(TedError::invalid_configuration(format!(
            "patch size {:?} is larger than data size {:?}",
            patch_size, dims
        )));
    }
    Ok(())
}

/// Resolve the batch size from environment with a safe fallback.
pub(crate) fn resolve_batch_size(configured: usize) -> usize {
    std::env::var(BATCH_SIZE_ENV)
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(configured)
}

pub(crate) fn resolve_profile_timing() -> bool {
    std::env::var(PROFILE_TIMING_ENV)
        .ok()
        .map(|value| {
            let v = value.trim();
            v == "1"
                || v.eq_ignore_ascii_case("true")
                || v.eq_ignore_ascii_case("yes")
                || v.eq_ignore_ascii_case("on")
        })
        .unwrap_or(false)
}
