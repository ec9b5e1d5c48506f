//! Patch placement over a (T, H, W) volume.
//!
//! Each spatial axis is tiled independently by [`axis_tiles`]: starts step by
//! the interval while the patch still fits, and one clipped tile is appended
//! when the stride grid stops short of the far boundary. Neighbouring tiles
//! split their overlap at its midpoint, so the write regions of one axis
//! partition `[0, dim)` exactly. The time axis is only enumerated by
//! [`time_starts`], without a clipped tile. [`generate_coordinates`] takes the
//! product of the three axes in (time, height, width) order.

use std::ops::RangeInclusive;

use crate::config::{axis_triple, check_fits, validate_geometry};
use crate::error::{Result, TedError};

/// One tile placement along a single axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisTile {
    /// First stack index covered by the patch.
    pub init: usize,
    /// One past the last stack index covered by the patch.
    pub end: usize,
    /// First stack index this tile writes during stitching.
    pub stack_start: usize,
    /// One past the last stack index this tile writes.
    pub stack_end: usize,
}

impl AxisTile {
    /// Write region start in patch-local indices.
    #[inline]
    pub fn patch_start(&self) -> usize {
        self.stack_start - self.init
    }

    /// Write region end in patch-local indices.
    #[inline]
    pub fn patch_end(&self) -> usize {
        self.stack_end - self.init
    }
}

/// Placement of one patch in the volume plus its stitching write region.
///
/// `init_*`/`end_*` describe the slice fed to the denoiser. The `stack_*`
/// fields are the output region this patch owns and the `patch_*` fields are
/// the same region relative to the patch origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub init_s: usize,
    pub end_s: usize,
    pub init_h: usize,
    pub end_h: usize,
    pub init_w: usize,
    pub end_w: usize,
    pub stack_start_h: usize,
    pub stack_end_h: usize,
    pub patch_start_h: usize,
    pub patch_end_h: usize,
    pub stack_start_w: usize,
    pub stack_end_w: usize,
    pub patch_start_w: usize,
    pub patch_end_w: usize,
}

impl Coordinate {
    fn from_tiles(init_s: usize, frames: usize, h: &AxisTile, w: &AxisTile) -> Self {
        Self {
            init_s,
            end_s: init_s + frames,
            init_h: h.init,
            end_h: h.end,
            init_w: w.init,
            end_w: w.end,
            stack_start_h: h.stack_start,
            stack_end_h: h.stack_end,
            patch_start_h: h.patch_start(),
            patch_end_h: h.patch_end(),
            stack_start_w: w.stack_start,
            stack_end_w: w.stack_end,
            patch_start_w: w.patch_start(),
            patch_end_w: w.patch_end(),
        }
    }

    /// Patch extent (t, h, w).
    #[inline]
    pub fn patch_dim(&self) -> (usize, usize, usize) {
        (
            self.end_s - self.init_s,
            self.end_h - self.init_h,
            self.end_w - self.init_w,
        )
    }

    /// Index of the centre frame within the patch.
    #[inline]
    pub fn center_offset(&self) -> usize {
        (self.end_s - self.init_s) / 2
    }

    /// Output frame this patch contributes to.
    #[inline]
    pub fn center_frame(&self) -> usize {
        self.init_s + self.center_offset()
    }

    /// Fail unless every axis has `init < end`.
    ///
    /// Fields are public, so hand-built coordinates are checked before any
    /// extent is computed from them.
    pub fn check_extent(&self) -> Result<()> {
        let axes = [
            ("s", self.init_s, self.end_s),
            ("h", self.init_h, self.end_h),
            ("w", self.init_w, self.end_w),
        ];
        for (axis, init, end) in axes {
            if init >= end {
                return Err(TedError::index_out_of_range(format!(
                    "empty or inverted patch range {}..{} on axis {}",
                    init, end, axis
                )));
            }
        }
        Ok(())
    }

    /// Fail unless the spatial write regions are well formed.
    ///
    /// Each write region must be ordered, lie inside the patch in
    /// patch-local indices, and have the same length in stack space.
    pub fn check_write_region(&self) -> Result<()> {
        self.check_extent()?;
        let (_, ph, pw) = self.patch_dim();
        let axes = [
            (
                "h",
                ph,
                self.stack_start_h,
                self.stack_end_h,
                self.patch_start_h,
                self.patch_end_h,
            ),
            (
                "w",
                pw,
                self.stack_start_w,
                self.stack_end_w,
                self.patch_start_w,
                self.patch_end_w,
            ),
        ];
        for (axis, extent, stack_start, stack_end, patch_start, patch_end) in axes {
            if stack_start > stack_end {
                return Err(TedError::index_out_of_range(format!(
                    "inverted write range {}..{} on axis {}",
                    stack_start, stack_end, axis
                )));
            }
            if patch_start > patch_end || patch_end > extent {
                return Err(TedError::index_out_of_range(format!(
                    "patch-local range {}..{} on axis {} outside patch extent {}",
                    patch_start, patch_end, axis, extent
                )));
            }
        }
        let stack_len = [
            self.stack_end_h - self.stack_start_h,
            self.stack_end_w - self.stack_start_w,
        ];
        let patch_len = [
            self.patch_end_h - self.patch_start_h,
            self.patch_end_w - self.patch_start_w,
        ];
        if stack_len != patch_len {
            return Err(TedError::shape_mismatch(&stack_len, &patch_len));
        }
        Ok(())
    }
}

/// Stride starts `0, interval, 2 * interval, ...` whose window still fits in `dim`.
fn stride_starts(dim: usize, size: usize, interval: usize) -> Vec<usize> {
    (0..)
        .map(|k| k * interval)
        .take_while(|&s| s + size <= dim)
        .collect()
}

/// Start frames of the temporal windows.
///
/// Unlike [`axis_tiles`] no clipped window is appended: with an interval
/// above one the trailing frames may never be a window start.
pub fn time_starts(frames: usize, size: usize, interval: usize) -> Vec<usize> {
    debug_assert!(interval >= 1 && interval <= size && size <= frames);
    stride_starts(frames, size, interval)
}

/// Tile a single axis of length `dim` with windows of `size` stepped by `interval`.
///
/// Callers guarantee `1 <= interval <= size <= dim`.
pub fn axis_tiles(dim: usize, size: usize, interval: usize) -> Vec<AxisTile> {
    debug_assert!(interval >= 1 && interval <= size && size <= dim);

    let mut starts = stride_starts(dim, size, interval);
    if let Some(&last) = starts.last() {
        if last + size < dim {
            starts.push(dim - size);
        }
    }

    // Boundary between tile k and k+1 is the midpoint of their overlap.
    let boundaries: Vec<usize> = starts
        .windows(2)
        .map(|pair| (pair[1] + pair[0] + size) / 2)
        .collect();

    let n = starts.len();
    starts
        .iter()
        .enumerate()
        .map(|(k, &init)| AxisTile {
            init,
            end: init + size,
            stack_start: if k == 0 { 0 } else { boundaries[k - 1] },
            stack_end: if k + 1 == n { dim } else { boundaries[k] },
        })
        .collect()
}

/// Generate every patch placement for a volume of `volume_shape`.
///
/// # Arguments
///
/// * `volume_shape` - (T, H, W) of the input stack
/// * `patch_size` - patch extent per axis, exactly 3 entries
/// * `patch_interval` - stride per axis, exactly 3 entries, each `<=` its size
///
/// # Returns
///
/// Coordinates ordered lexicographically by (time, height, width) start.
pub fn generate_coordinates(
    volume_shape: (usize, usize, usize),
    patch_size: &[usize],
    patch_interval: &[usize],
) -> Result<Vec<Coordinate>> {
    let size = axis_triple(patch_size, "patch_size")?;
    let interval = axis_triple(patch_interval, "patch_interval")?;
    validate_geometry(&size, &interval)?;
    check_fits(volume_shape, &size)?;

    let (t, h, w) = volume_shape;
    let starts_s = time_starts(t, size[0], interval[0]);
    let tiles_h = axis_tiles(h, size[1], interval[1]);
    let tiles_w = axis_tiles(w, size[2], interval[2]);

    let mut coordinates = Vec::with_capacity(starts_s.len() * tiles_h.len() * tiles_w.len());
    for &init_s in &starts_s {
        for th in &tiles_h {
            for tw in &tiles_w {
                coordinates.push(Coordinate::from_tiles(init_s, size[0], th, tw));
            }
        }
    }

    tracing::debug!(
        shape = ?volume_shape,
        patch_size = ?size,
        patch_interval = ?interval,
        time_windows = starts_s.len(),
        height_tiles = tiles_h.len(),
        width_tiles = tiles_w.len(),
        "generated patch coordinates"
    );

    Ok(coordinates)
}

/// Output frames that receive a patch centre when the time axis is stepped by one.
///
/// Frames outside this range are never written by the stitcher.
pub fn written_frame_range(num_frames: usize, patch_frames: usize) -> Result<RangeInclusive<usize>> {
    if patch_frames == 0 || patch_frames > num_frames {
        return Err(TedError::invalid_configuration(format!(
            "patch_frames {} must be in 1..={}",
            patch_frames, num_frames
        )));
    }
    let half = patch_frames / 2;
    Ok(half..=num_frames - patch_frames + half)
}
