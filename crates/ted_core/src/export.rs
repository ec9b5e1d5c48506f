//! Preparing the stitched stack for an 8-bit writer.
//!
//! Edge frames that no patch centre reached are dropped, samples are clamped
//! to `[0, 255]` and truncated to `u8`. Encoding the result is left to the
//! caller.

use ndarray::{s, Array3, ArrayView3};

use crate::coordinates::written_frame_range;
use crate::error::Result;
use crate::float_trait::TedFloat;

/// Trim unwritten edge frames, clamp to `[0, 255]` and cast to `u8`.
///
/// `patch_frames` is the temporal patch extent used for stitching; NaN
/// samples map to 0.
pub fn to_u8_stack<F: TedFloat>(volume: ArrayView3<F>, patch_frames: usize) -> Result<Array3<u8>> {
    let frames = written_frame_range(volume.dim().0, patch_frames)?;
    let lo = F::zero();
    let hi = F::from_f64_c(255.0);
    let kept = volume.slice(s![*frames.start()..=*frames.end(), .., ..]);
    Ok(kept.mapv(|v| {
        if v.is_nan() {
            0
        } else {
            v.max(lo).min(hi).to_u8().unwrap_or(0)
        }
    }))
}
