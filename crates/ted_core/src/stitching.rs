//! Centre-frame stitching of denoised patches.
//!
//! Every patch owns exactly one output frame (`init_s + t/2`) and, within
//! it, the write region recorded in its [`Coordinate`]. Because the write
//! regions of neighbouring tiles partition each axis, inserts never overlap
//! and arrival order does not matter. Debug builds keep a written-flags array
//! and reject a second write to any pixel.

use ndarray::{s, Array3, ArrayView3, Axis};

use crate::coordinates::Coordinate;
use crate::error::{Result, TedError};
use crate::float_trait::TedFloat;
use crate::normalization::NormalizationParams;

/// Accumulates denoised patch contributions into a full-size output stack.
///
/// `insert` takes `&mut self`: concurrent producers hand their results to a
/// single owner.
pub struct StitchAssembler<F: TedFloat> {
    output: Array3<F>,
    frames_written: Vec<bool>,
    inserted: usize,
    #[cfg(debug_assertions)]
    written: Array3<bool>,
}

impl<F: TedFloat> StitchAssembler<F> {
    /// Create an assembler with a zero-initialised output of `output_shape`.
    pub fn new(output_shape: (usize, usize, usize)) -> Self {
        Self {
            output: Array3::zeros(output_shape),
            frames_written: vec![false; output_shape.0],
            inserted: 0,
            #[cfg(debug_assertions)]
            written: Array3::from_elem(output_shape, false),
        }
    }

    /// Output shape (T, H, W).
    pub fn shape(&self) -> (usize, usize, usize) {
        self.output.dim()
    }

    /// Number of patches inserted so far.
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// Output frames no patch has written yet.
    pub fn unwritten_frames(&self) -> Vec<usize> {
        self.frames_written
            .iter()
            .enumerate()
            .filter_map(|(i, &w)| (!w).then_some(i))
            .collect()
    }

    /// Write the centre frame of one denoised patch.
    ///
    /// `denoised` is either the full patch `(t, h, w)` or just its centre
    /// frame `(1, h, w)`. Malformed coordinates are rejected before anything
    /// is written.
    pub fn insert(&mut self, coordinate: &Coordinate, denoised: ArrayView3<F>) -> Result<()> {
        coordinate.check_write_region()?;
        let (t_out, h_out, w_out) = self.output.dim();
        let (pt, ph, pw) = coordinate.patch_dim();
        let (dt, dh, dw) = denoised.dim();

        let frame = coordinate.center_frame();
        if frame >= t_out {
            return Err(TedError::index_out_of_range(format!(
                "centre frame {} outside output with {} frames",
                frame, t_out
            )));
        }
        if coordinate.stack_end_h > h_out || coordinate.stack_end_w > w_out {
            return Err(TedError::index_out_of_range(format!(
                "write region [{}..{}, {}..{}] outside output of {}x{}",
                coordinate.stack_start_h,
                coordinate.stack_end_h,
                coordinate.stack_start_w,
                coordinate.stack_end_w,
                h_out,
                w_out
            )));
        }

        let source_frame = if dt == pt {
            coordinate.center_offset()
        } else if dt == 1 {
            0
        } else {
            return Err(TedError::shape_mismatch(&[pt, ph, pw], &[dt, dh, dw]));
        };
        if dh != ph || dw != pw {
            return Err(TedError::shape_mismatch(&[pt, ph, pw], &[dt, dh, dw]));
        }

        let rows = coordinate.stack_start_h..coordinate.stack_end_h;
        let cols = coordinate.stack_start_w..coordinate.stack_end_w;

        #[cfg(debug_assertions)]
        {
            let mut region = self
                .written
                .slice_mut(s![frame, rows.clone(), cols.clone()]);
            if let Some(((r, c), _)) = region.indexed_iter().find(|(_, w)| **w) {
                return Err(TedError::OverlappingWrite {
                    frame,
                    row: rows.start + r,
                    col: cols.start + c,
                });
            }
            region.fill(true);
        }

        let source = denoised.index_axis(Axis(0), source_frame);
        let source = source.slice(s![
            coordinate.patch_start_h..coordinate.patch_end_h,
            coordinate.patch_start_w..coordinate.patch_end_w
        ]);
        self.output.slice_mut(s![frame, rows, cols]).assign(&source);

        self.frames_written[frame] = true;
        self.inserted += 1;
        Ok(())
    }

    /// Undo the normalization and hand the stitched stack to the caller.
    pub fn finalize(self, params: &NormalizationParams<F>) -> Array3<F> {
        let unwritten = self.unwritten_frames();
        if !unwritten.is_empty() {
            tracing::warn!(
                count = unwritten.len(),
                first = unwritten.first().copied(),
                last = unwritten.last().copied(),
                "output frames received no patch centre"
            );
        }
        let mut output = self.output;
        params.invert_inplace(&mut output);
        output
    }

    /// Hand over the stitched stack without de-normalizing.
    pub fn into_normalized(self) -> Array3<F> {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::generate_coordinates;
    use crate::extraction::extract_patches;

    #[test]
    fn test_identity_stitch_single_spatial_tile() {
        let volume = Array3::from_shape_fn((21, 32, 32), |(t, r, c)| (t * 3 + r + 2 * c) as f64);
        let params = NormalizationParams::fit(&volume).unwrap();
        let coords = generate_coordinates(volume.dim(), &[21, 32, 32], &[1, 16, 16]).unwrap();
        assert_eq!(coords.len(), 1);

        let patches = extract_patches(volume.view(), &coords, &params, 255.0).unwrap();
        let mut assembler = StitchAssembler::new(volume.dim());
        for p in &patches {
            assembler.insert(&p.coordinate, p.data.view()).unwrap();
        }
        let normalized = params.apply(&volume);
        let stitched = assembler.into_normalized();
        assert_eq!(
            stitched.index_axis(Axis(0), 10),
            normalized.index_axis(Axis(0), 10)
        );
        assert!(stitched.index_axis(Axis(0), 0).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_insert_is_order_independent() {
        let volume = Array3::from_shape_fn((5, 30, 26), |(t, r, c)| ((t * 31 + r * 7 + c * 3) % 17) as f32);
        let params = NormalizationParams::fit(&volume).unwrap();
        let coords = generate_coordinates(volume.dim(), &[3, 12, 10], &[1, 6, 4]).unwrap();
        let patches = extract_patches(volume.view(), &coords, &params, 255.0).unwrap();

        let mut forward = StitchAssembler::new(volume.dim());
        for p in &patches {
            forward.insert(&p.coordinate, p.data.view()).unwrap();
        }
        let mut backward = StitchAssembler::new(volume.dim());
        for p in patches.iter().rev() {
            backward.insert(&p.coordinate, p.data.view()).unwrap();
        }
        assert_eq!(forward.into_normalized(), backward.into_normalized());
    }

    #[test]
    fn test_centre_frame_only_input() {
        let volume = Array3::from_shape_fn((3, 8, 8), |(t, r, c)| (t * 64 + r * 8 + c) as f32);
        let params = NormalizationParams::fit(&volume).unwrap();
        let coords = generate_coordinates(volume.dim(), &[3, 8, 8], &[1, 8, 8]).unwrap();
        let patches = extract_patches(volume.view(), &coords, &params, 255.0).unwrap();

        let mut assembler = StitchAssembler::new(volume.dim());
        let centre = patches[0].data.slice(s![1..2, .., ..]);
        assembler.insert(&patches[0].coordinate, centre).unwrap();
        let out = assembler.finalize(&params);
        for r in 0..8 {
            for c in 0..8 {
                assert!((out[[1, r, c]] - volume[[1, r, c]]).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_finalize_denormalizes_and_reports_unwritten() {
        let params = NormalizationParams::new(100.0f32, 4.0).unwrap();
        let coords = generate_coordinates((3, 4, 4), &[3, 4, 4], &[1, 4, 4]).unwrap();
        let mut assembler = StitchAssembler::new((3, 4, 4));
        assert_eq!(assembler.unwritten_frames(), vec![0, 1, 2]);

        let ones = Array3::from_elem((3, 4, 4), 1.0f32);
        assembler.insert(&coords[0], ones.view()).unwrap();
        assert_eq!(assembler.unwritten_frames(), vec![0, 2]);
        assert_eq!(assembler.inserted(), 1);

        let out = assembler.finalize(&params);
        assert!(out.index_axis(Axis(0), 1).iter().all(|&v| v == 104.0));
        // Unwritten frames hold the zero sentinel, i.e. the mean after inversion.
        assert!(out.index_axis(Axis(0), 0).iter().all(|&v| v == 100.0));
    }

    #[test]
    fn test_insert_rejects_out_of_range_frame() {
        let coords = generate_coordinates((9, 4, 4), &[3, 4, 4], &[1, 4, 4]).unwrap();
        let mut assembler = StitchAssembler::<f32>::new((5, 4, 4));
        let patch = Array3::zeros((3, 4, 4));
        // Centre frame 7 of the last coordinate lies outside 5 output frames.
        let err = assembler
            .insert(coords.last().unwrap(), patch.view())
            .unwrap_err();
        assert!(matches!(err, TedError::IndexOutOfRange(_)));
    }

    #[test]
    fn test_insert_rejects_spatial_overrun() {
        let coords = generate_coordinates((3, 8, 8), &[3, 4, 4], &[1, 4, 4]).unwrap();
        let mut assembler = StitchAssembler::<f32>::new((3, 6, 6));
        let patch = Array3::zeros((3, 4, 4));
        let err = assembler
            .insert(coords.last().unwrap(), patch.view())
            .unwrap_err();
        assert!(matches!(err, TedError::IndexOutOfRange(_)));
    }

    #[test]
    fn test_insert_rejects_malformed_coordinate() {
        let coord = generate_coordinates((3, 8, 8), &[3, 8, 8], &[1, 8, 8]).unwrap()[0];
        let mut assembler = StitchAssembler::<f32>::new((3, 8, 8));
        let patch = Array3::zeros((3, 8, 8));

        let past_patch = Coordinate {
            patch_end_h: 20,
            ..coord
        };
        let err = assembler.insert(&past_patch, patch.view()).unwrap_err();
        assert!(matches!(err, TedError::IndexOutOfRange(_)));

        let unequal = Coordinate {
            stack_end_w: 5,
            ..coord
        };
        let err = assembler.insert(&unequal, patch.view()).unwrap_err();
        assert!(matches!(err, TedError::ShapeMismatch { .. }));

        let inverted = Coordinate {
            init_s: 2,
            end_s: 0,
            ..coord
        };
        let err = assembler.insert(&inverted, patch.view()).unwrap_err();
        assert!(matches!(err, TedError::IndexOutOfRange(_)));

        // Nothing was written, so the valid coordinate still goes in.
        assert_eq!(assembler.inserted(), 0);
        assembler.insert(&coord, patch.view()).unwrap();
        assert_eq!(assembler.unwritten_frames(), vec![0, 2]);
    }

    #[test]
    fn test_shape_reports_output_dimensions() {
        let assembler = StitchAssembler::<f64>::new((4, 6, 5));
        assert_eq!(assembler.shape(), (4, 6, 5));
        assert_eq!(assembler.into_normalized().dim(), (4, 6, 5));
    }

    #[test]
    fn test_insert_rejects_wrong_shape() {
        let coords = generate_coordinates((3, 4, 4), &[3, 4, 4], &[1, 4, 4]).unwrap();
        let mut assembler = StitchAssembler::<f32>::new((3, 4, 4));
        let err = assembler
            .insert(&coords[0], Array3::zeros((2, 4, 4)).view())
            .unwrap_err();
        assert!(matches!(err, TedError::ShapeMismatch { .. }));
        let err = assembler
            .insert(&coords[0], Array3::zeros((3, 4, 5)).view())
            .unwrap_err();
        assert!(matches!(err, TedError::ShapeMismatch { .. }));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_double_write_is_detected() {
        let coords = generate_coordinates((3, 4, 4), &[3, 4, 4], &[1, 4, 4]).unwrap();
        let mut assembler = StitchAssembler::<f32>::new((3, 4, 4));
        let patch = Array3::zeros((3, 4, 4));
        assembler.insert(&coords[0], patch.view()).unwrap();
        let err = assembler.insert(&coords[0], patch.view()).unwrap_err();
        assert_eq!(
            err,
            TedError::OverlappingWrite {
                frame: 1,
                row: 0,
                col: 0
            }
        );
    }
}
