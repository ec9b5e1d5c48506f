//! Patch extraction for inference.
//!
//! Slices a patch out of the read-only input stack, computes its confidence
//! map on the raw samples, then normalizes the samples with the volume
//! statistics. Extraction never mutates shared state, so batches are
//! extracted on the rayon pool.

use ndarray::{s, Array3, ArrayView3};
use rayon::prelude::*;

use crate::coordinates::Coordinate;
use crate::error::{Result, TedError};
use crate::float_trait::TedFloat;
use crate::gradient_map::temporal_gradient_map;
use crate::normalization::NormalizationParams;

/// A normalized patch, its confidence map and where it came from.
#[derive(Debug, Clone)]
pub struct Patch<F: TedFloat> {
    /// Normalized samples, shape (t, h, w).
    pub data: Array3<F>,
    /// Temporal-gradient confidence map, same shape as `data`.
    pub gradient_map: Array3<F>,
    pub coordinate: Coordinate,
}

/// Check that `coordinate` lies inside a volume of `shape`.
pub(crate) fn check_in_bounds(coordinate: &Coordinate, shape: (usize, usize, usize)) -> Result<()> {
    coordinate.check_extent()?;
    let (t, h, w) = shape;
    if coordinate.end_s > t || coordinate.end_h > h || coordinate.end_w > w {
        return Err(TedError::index_out_of_range(format!(
            "patch [{}..{}, {}..{}, {}..{}] exceeds volume shape {:?}",
            coordinate.init_s,
            coordinate.end_s,
            coordinate.init_h,
            coordinate.end_h,
            coordinate.init_w,
            coordinate.end_w,
            shape
        )));
    }
    Ok(())
}

/// Extract a single patch.
///
/// The confidence map is computed with `num_time_channels` equal to the
/// patch's own temporal extent.
pub fn extract_patch<F: TedFloat>(
    volume: ArrayView3<F>,
    coordinate: &Coordinate,
    params: &NormalizationParams<F>,
    gradient_scale: F,
) -> Result<Patch<F>> {
    check_in_bounds(coordinate, volume.dim())?;

    let raw = volume.slice(s![
        coordinate.init_s..coordinate.end_s,
        coordinate.init_h..coordinate.end_h,
        coordinate.init_w..coordinate.end_w
    ]);
    let gradient_map = temporal_gradient_map(raw, raw.dim().0, gradient_scale)?;
    let data = params.apply(&raw);

    Ok(Patch {
        data,
        gradient_map,
        coordinate: *coordinate,
    })
}

/// Extract a batch of patches in parallel, preserving the input order.
pub fn extract_patches<F: TedFloat>(
    volume: ArrayView3<F>,
    coordinates: &[Coordinate],
    params: &NormalizationParams<F>,
    gradient_scale: F,
) -> Result<Vec<Patch<F>>> {
    coordinates
        .par_iter()
        .map(|c| extract_patch(volume, c, params, gradient_scale))
        .collect()
}
