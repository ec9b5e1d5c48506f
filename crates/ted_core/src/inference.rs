//! Inference seam.
//!
//! The model is a black box that maps a batch of patches to a batch of
//! denoised patches. Results carry their [`Coordinate`], never just a
//! position in the batch, so an implementation may reorder, split or
//! regroup work freely.

use ndarray::Array3;

use crate::coordinates::Coordinate;
use crate::error::Result;
use crate::extraction::Patch;
use crate::float_trait::TedFloat;

/// Model output for one patch.
///
/// `data` is either the full patch `(t, h, w)` or its centre frame `(1, h, w)`.
#[derive(Debug, Clone)]
pub struct DenoisedPatch<F: TedFloat> {
    pub coordinate: Coordinate,
    pub data: Array3<F>,
}

/// A batched denoiser.
pub trait Denoiser<F: TedFloat>: Sync {
    /// Denoise one batch, returning one result per input patch.
    fn denoise_batch(&self, batch: &[Patch<F>]) -> Result<Vec<DenoisedPatch<F>>>;
}

impl<F, Func> Denoiser<F> for Func
where
    F: TedFloat,
    Func: Fn(&[Patch<F>]) -> Result<Vec<DenoisedPatch<F>>> + Sync,
{
    fn denoise_batch(&self, batch: &[Patch<F>]) -> Result<Vec<DenoisedPatch<F>>> {
        self(batch)
    }
}

/// Returns every normalized patch unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityDenoiser;

impl<F: TedFloat> Denoiser<F> for IdentityDenoiser {
    fn denoise_batch(&self, batch: &[Patch<F>]) -> Result<Vec<DenoisedPatch<F>>> {
        Ok(batch
            .iter()
            .map(|p| DenoisedPatch {
                coordinate: p.coordinate,
                data: p.data.clone(),
            })
            .collect())
    }
}
