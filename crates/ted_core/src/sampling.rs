//! Training-time patch sampling.
//!
//! Draws one random crop per loaded stack, optionally rotates it by a
//! multiple of 90° in the H×W plane and flips it along H, then pairs it with
//! its confidence map. Statistics come from the whole stack, not the crop.
//! The random generator is always supplied by the caller, so seeded runs are
//! reproducible and tests never share generator state.

use ndarray::{s, Array3, ArrayView3, Axis};
use rand::Rng;

use crate::config::axis_triple;
use crate::error::{Result, TedError};
use crate::float_trait::TedFloat;
use crate::gradient_map::temporal_gradient_map;
use crate::normalization::NormalizationParams;

/// One augmented training patch.
#[derive(Debug, Clone)]
pub struct TrainingSample<F: TedFloat> {
    /// Normalized, augmented samples.
    pub data: Array3<F>,
    /// Confidence map of the augmented raw crop.
    pub gradient_map: Array3<F>,
    /// `[start, end)` of the crop in the source stack, per axis (T, H, W).
    pub ranges: [[usize; 2]; 3],
    /// Statistics used for `data`.
    pub params: NormalizationParams<F>,
}

/// Random crop + rotate/flip sampler.
#[derive(Debug, Clone)]
pub struct PatchSampler<F: TedFloat> {
    patch_size: [usize; 3],
    augment: bool,
    gradient_scale: F,
}

impl<F: TedFloat> PatchSampler<F> {
    /// Create a sampler with augmentation on and the default gradient scale.
    pub fn new(patch_size: &[usize]) -> Result<Self> {
        let patch_size = axis_triple(patch_size, "patch_size")?;
        if patch_size.contains(&0) {
            return Err(TedError::invalid_configuration(
                "patch_size entries must be > 0",
            ));
        }
        Ok(Self {
            patch_size,
            augment: true,
            gradient_scale: F::GRADIENT_SCALE,
        })
    }

    /// Enable or disable the random rotate/flip.
    pub fn with_augmentation(mut self, augment: bool) -> Self {
        self.augment = augment;
        self
    }

    /// Override the gradient divisor.
    pub fn with_gradient_scale(mut self, scale: F) -> Self {
        self.gradient_scale = scale;
        self
    }

    pub fn patch_size(&self) -> [usize; 3] {
        self.patch_size
    }

    /// Fit statistics on `volume` and draw one sample.
    pub fn sample<R: Rng + ?Sized>(&self, volume: ArrayView3<F>, rng: &mut R) -> Result<TrainingSample<F>> {
        let params = NormalizationParams::fit(&volume)?;
        self.sample_with_params(volume, &params, rng)
    }

    /// Draw one sample using precomputed per-file statistics.
    pub fn sample_with_params<R: Rng + ?Sized>(
        &self,
        volume: ArrayView3<F>,
        params: &NormalizationParams<F>,
        rng: &mut R,
    ) -> Result<TrainingSample<F>> {
        let (t, h, w) = volume.dim();
        let [pt, ph, pw] = self.patch_size;
        if t < pt || h < ph || w < pw {
            return Err(TedError::invalid_configuration(format!(
                "patch size {:?} is larger than data size {:?}",
                self.patch_size,
                [t, h, w]
            )));
        }

        let t0 = rng.gen_range(0..=t - pt);
        let y0 = rng.gen_range(0..=h - ph);
        let x0 = rng.gen_range(0..=w - pw);
        let ranges = [[t0, t0 + pt], [y0, y0 + ph], [x0, x0 + pw]];

        let crop = volume.slice(s![t0..t0 + pt, y0..y0 + ph, x0..x0 + pw]);
        let crop = if self.augment {
            let quarter_turns = rng.gen_range(0..4);
            let flip = rng.gen_range(0..2) == 1;
            random_rotate_flip(crop, quarter_turns, flip)
        } else {
            crop.to_owned()
        };

        let gradient_map = temporal_gradient_map(crop.view(), pt, self.gradient_scale)?;
        let data = params.apply(&crop);

        Ok(TrainingSample {
            data,
            gradient_map,
            ranges,
            params: *params,
        })
    }
}

/// Rotate by `quarter_turns` × 90° in the H×W plane, then optionally flip along H.
///
/// Rotation direction matches `numpy.rot90` on the (H, W) axes. Non-square
/// crops swap their spatial extents for odd turns.
pub fn random_rotate_flip<F: TedFloat>(patch: ArrayView3<F>, quarter_turns: u32, flip: bool) -> Array3<F> {
    let mut view = patch;
    match quarter_turns % 4 {
        1 => {
            view = view.permuted_axes([0, 2, 1]);
            view.invert_axis(Axis(1));
        }
        2 => {
            view.invert_axis(Axis(1));
            view.invert_axis(Axis(2));
        }
        3 => {
            view = view.permuted_axes([0, 2, 1]);
            view.invert_axis(Axis(2));
        }
        _ => {}
    }
    if flip {
        view.invert_axis(Axis(1));
    }
    view.as_standard_layout().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn stack() -> Array3<f32> {
        Array3::from_shape_fn((10, 24, 24), |(t, r, c)| (t * 1000 + r * 24 + c) as f32)
    }

    #[test]
    fn test_rotate_matches_rot90() {
        let patch = array![[[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]]];
        // numpy.rot90 of [[1,2,3],[4,5,6]] is [[3,6],[2,5],[1,4]]
        let r1 = random_rotate_flip(patch.view(), 1, false);
        assert_eq!(r1, array![[[3.0f32, 6.0], [2.0, 5.0], [1.0, 4.0]]]);

        let r2 = random_rotate_flip(patch.view(), 2, false);
        assert_eq!(r2, array![[[6.0f32, 5.0, 4.0], [3.0, 2.0, 1.0]]]);

        let r3 = random_rotate_flip(patch.view(), 3, false);
        assert_eq!(r3, array![[[4.0f32, 1.0], [5.0, 2.0], [6.0, 3.0]]]);

        let f = random_rotate_flip(patch.view(), 0, true);
        assert_eq!(f, array![[[4.0f32, 5.0, 6.0], [1.0, 2.0, 3.0]]]);
    }

    #[test]
    fn test_sample_is_reproducible_with_seed() {
        let volume = stack();
        let sampler = PatchSampler::<f32>::new(&[5, 8, 8]).unwrap();
        let a = sampler
            .sample(volume.view(), &mut StdRng::seed_from_u64(0))
            .unwrap();
        let b = sampler
            .sample(volume.view(), &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(a.ranges, b.ranges);
        assert_eq!(a.data, b.data);
        assert_eq!(a.gradient_map, b.gradient_map);
    }

    #[test]
    fn test_sample_ranges_and_shapes() {
        let volume = stack();
        let sampler = PatchSampler::<f32>::new(&[5, 8, 8]).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let sample = sampler.sample(volume.view(), &mut rng).unwrap();
            assert_eq!(sample.data.dim(), (5, 8, 8));
            assert_eq!(sample.gradient_map.dim(), (5, 8, 8));
            for (axis, dim) in [10usize, 24, 24].iter().enumerate() {
                let [start, end] = sample.ranges[axis];
                assert_eq!(end - start, sampler.patch_size()[axis]);
                assert!(end <= *dim);
            }
        }
    }

    #[test]
    fn test_sample_without_augmentation_is_plain_crop() {
        let volume = stack();
        let params = NormalizationParams::fit(&volume).unwrap();
        let sampler = PatchSampler::<f32>::new(&[3, 6, 6])
            .unwrap()
            .with_augmentation(false);
        let sample = sampler
            .sample_with_params(volume.view(), &params, &mut StdRng::seed_from_u64(9))
            .unwrap();
        let [[t0, _], [y0, _], [x0, _]] = sample.ranges;
        let expected = (volume[[t0 + 1, y0 + 2, x0 + 3]] - params.mean) / params.std;
        assert_eq!(sample.data[[1, 2, 3]], expected);
        assert_eq!(sample.params, params);
    }

    #[test]
    fn test_gradient_scale_override() {
        // Every frame steps by 51 counts over the previous one.
        let volume = Array3::from_shape_fn((5, 6, 6), |(t, _, _)| t as f64 * 51.0);
        let default_scale = PatchSampler::<f64>::new(&[3, 4, 4])
            .unwrap()
            .with_augmentation(false);
        let double_scale = default_scale.clone().with_gradient_scale(510.0);

        let a = default_scale
            .sample(volume.view(), &mut StdRng::seed_from_u64(3))
            .unwrap();
        let b = double_scale
            .sample(volume.view(), &mut StdRng::seed_from_u64(3))
            .unwrap();
        assert_eq!(a.ranges, b.ranges);
        assert!((a.gradient_map[[0, 1, 1]] - 0.8).abs() < 1e-12);
        assert!((b.gradient_map[[0, 1, 1]] - 0.9).abs() < 1e-12);
        assert_eq!(a.data, b.data);
    }

    #[test]
    fn test_sampler_rejects_bad_configuration() {
        assert!(PatchSampler::<f32>::new(&[5, 8]).is_err());
        assert!(PatchSampler::<f32>::new(&[5, 0, 8]).is_err());

        let volume = stack();
        let sampler = PatchSampler::<f32>::new(&[11, 8, 8]).unwrap();
        let err = sampler
            .sample(volume.view(), &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(matches!(err, TedError::InvalidConfiguration(_)));
    }
}
