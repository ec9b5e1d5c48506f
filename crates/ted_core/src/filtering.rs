//! Spatial box filtering for time-series stacks.
//!
//! The mean filter averages only in-bounds neighbours, so borders are not
//! darkened by implicit zero padding. A box mean with valid-count
//! normalization is separable: the 2D window count is the product of the row
//! and column counts, so two 1D passes give the exact 2D result.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

use crate::float_trait::TedFloat;

/// Side length of the box used by the temporal-gradient map.
pub const GRADIENT_BOX_SIZE: usize = 3;

/// 1D box mean with valid-count normalization, written into `output`.
#[inline]
fn box_mean_1d<F: TedFloat>(input: &[F], radius: usize, output: &mut [F]) {
    let n = input.len();
    debug_assert_eq!(output.len(), n);
    if n == 0 {
        return;
    }

    // Prefix sums keep the cost independent of the radius.
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(F::zero());
    let mut acc = F::zero();
    for &v in input {
        acc += v;
        prefix.push(acc);
    }

    for (i, out) in output.iter_mut().enumerate() {
        let lo = i.saturating_sub(radius);
        let hi = (i + radius + 1).min(n);
        *out = (prefix[hi] - prefix[lo]) / F::usize_as(hi - lo);
    }
}

/// Box mean over one 2D slice.
///
/// `size` is the full window side; even sizes are rounded up to the next odd
/// window so the filter stays centred.
pub fn mean_filter_2d<F: TedFloat>(input: ArrayView2<F>, size: usize) -> Array2<F> {
    let (rows, cols) = input.dim();
    let radius = size / 2;
    let mut horizontal = Array2::zeros((rows, cols));
    let mut row_buf = vec![F::zero(); cols];
    let mut out_buf = vec![F::zero(); cols];

    for (src, mut dst) in input.outer_iter().zip(horizontal.outer_iter_mut()) {
        for (b, &v) in row_buf.iter_mut().zip(src.iter()) {
            *b = v;
        }
        box_mean_1d(&row_buf, radius, &mut out_buf);
        for (d, &v) in dst.iter_mut().zip(out_buf.iter()) {
            *d = v;
        }
    }

    let mut output = Array2::zeros((rows, cols));
    let mut col_buf = vec![F::zero(); rows];
    let mut col_out = vec![F::zero(); rows];
    for (src, mut dst) in horizontal
        .axis_iter(Axis(1))
        .zip(output.axis_iter_mut(Axis(1)))
    {
        for (b, &v) in col_buf.iter_mut().zip(src.iter()) {
            *b = v;
        }
        box_mean_1d(&col_buf, radius, &mut col_out);
        for (d, &v) in dst.iter_mut().zip(col_out.iter()) {
            *d = v;
        }
    }

    output
}

/// Apply [`mean_filter_2d`] independently to every time slice of a stack.
pub fn mean_filter_stack<F: TedFloat>(input: ArrayView3<F>, size: usize) -> Array3<F> {
    let mut output = Array3::zeros(input.raw_dim());
    for (mut dst, src) in output.outer_iter_mut().zip(input.outer_iter()) {
        dst.assign(&mean_filter_2d(src, size));
    }
    output
}
