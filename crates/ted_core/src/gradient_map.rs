//! Temporal-gradient confidence map.
//!
//! Every patch is paired with a map of the same shape that tells the model how
//! much a pixel changed between its frame and the patch's centre frame:
//!
//! 1. 3×3 spatial box mean of every frame
//! 2. Signed frame difference pointing away from the centre frame
//! 3. Absolute value, box mean again
//! 4. Running max outward from the centre, so a frame inherits the largest
//!    change seen anywhere between it and the centre
//! 5. `1 - value / scale`
//!
//! A static pixel therefore scores 1.0. The result is not clamped: raw
//! gradients larger than `scale` go negative.

use ndarray::{s, Array3, ArrayView3, Axis, Zip};

use crate::error::{Result, TedError};
use crate::filtering::{mean_filter_stack, GRADIENT_BOX_SIZE};
use crate::float_trait::TedFloat;

/// Compute the confidence map of one raw (un-normalized) patch.
///
/// # Arguments
///
/// * `patch` - patch samples, shape (t, h, w)
/// * `num_time_channels` - temporal extent the model was built for; must equal `t`
/// * `scale` - divisor for raw gradients, 255.0 for 8-bit data
pub fn temporal_gradient_map<F: TedFloat>(
    patch: ArrayView3<F>,
    num_time_channels: usize,
    scale: F,
) -> Result<Array3<F>> {
    let (t, h, w) = patch.dim();
    if num_time_channels != t {
        return Err(TedError::shape_mismatch(
            &[num_time_channels, h, w],
            &[t, h, w],
        ));
    }
    if scale <= F::zero() || !scale.is_finite() {
        return Err(TedError::invalid_configuration(
            "gradient scale must be finite and > 0",
        ));
    }
    if t == 0 {
        return Ok(Array3::zeros((0, h, w)));
    }

    let center = num_time_channels / 2;
    let filtered = mean_filter_stack(patch, GRADIENT_BOX_SIZE);

    // Signed difference anchored at the centre frame; the centre itself stays 0.
    let mut diff = Array3::<F>::zeros((t, h, w));
    for i in 0..t {
        let neighbour = if i > center {
            i - 1
        } else if i < center {
            i + 1
        } else {
            continue;
        };
        Zip::from(diff.index_axis_mut(Axis(0), i))
            .and(filtered.index_axis(Axis(0), i))
            .and(filtered.index_axis(Axis(0), neighbour))
            .for_each(|d, &cur, &nb| *d = (cur - nb).abs());
    }
    let grad = mean_filter_stack(diff.view(), GRADIENT_BOX_SIZE);

    let mut map = Array3::<F>::zeros((t, h, w));

    // Forward side: center+1 .. t
    for i in center + 1..t {
        let (mut head, tail) = map.view_mut().split_at(Axis(0), i);
        let mut current = tail.index_axis_move(Axis(0), 0);
        let g = grad.index_axis(Axis(0), i);
        if i == center + 1 {
            current.assign(&g);
        } else {
            let prev = head.index_axis_mut(Axis(0), i - 1);
            Zip::from(&mut current)
                .and(&prev)
                .and(&g)
                .for_each(|m, &p, &v| *m = if v > p { v } else { p });
        }
    }

    // Backward side: center-1 down to 0
    for i in (0..center).rev() {
        let (head, mut tail) = map.view_mut().split_at(Axis(0), i + 1);
        let mut current = head.index_axis_move(Axis(0), i);
        let g = grad.index_axis(Axis(0), i);
        if i + 1 == center {
            current.assign(&g);
        } else {
            let prev = tail.index_axis_mut(Axis(0), 0);
            Zip::from(&mut current)
                .and(&prev)
                .and(&g)
                .for_each(|m, &p, &v| *m = if v > p { v } else { p });
        }
    }

    map.mapv_inplace(|v| F::one() - v / scale);
    debug_assert!(map
        .slice(s![center, .., ..])
        .iter()
        .all(|&v| v == F::one()));

    Ok(map)
}
