//! Test-time stack pipeline.
//!
//! Wires the stages together for one volume:
//! - Fit volume statistics
//! - Generate patch coordinates
//! - Per batch: parallel extraction → denoiser → stitch
//! - De-normalize the stitched output
//!
//! Set `TED_PROFILE_TIMING=1` for a per-volume timing summary and
//! `TED_BATCH_SIZE` to override the configured batch size.

use std::time::Instant;

use ndarray::{Array3, ArrayView3};
use rustc_hash::FxHashSet;

use crate::config::{resolve_batch_size, resolve_profile_timing, StitchConfig};
use crate::coordinates::{generate_coordinates, Coordinate};
use crate::error::{Result, TedError};
use crate::extraction::extract_patches;
use crate::float_trait::TedFloat;
use crate::inference::{DenoisedPatch, Denoiser};
use crate::normalization::NormalizationParams;
use crate::stitching::StitchAssembler;

#[derive(Default, Clone, Copy)]
struct StageStats {
    batches: u64,
    patches: u64,
    extraction_ns: u128,
    inference_ns: u128,
    stitch_ns: u128,
}

/// Check that a denoiser answered exactly the batch it was given.
fn check_batch_pairing<F: TedFloat>(
    batch: &[Coordinate],
    results: &[DenoisedPatch<F>],
) -> Result<()> {
    if results.len() != batch.len() {
        return Err(TedError::inference(format!(
            "denoiser returned {} results for a batch of {}",
            results.len(),
            batch.len()
        )));
    }
    let expected: FxHashSet<&Coordinate> = batch.iter().collect();
    let mut seen: FxHashSet<&Coordinate> =
        FxHashSet::with_capacity_and_hasher(results.len(), Default::default());
    for result in results {
        if !expected.contains(&result.coordinate) {
            return Err(TedError::inference(format!(
                "denoiser returned a result for a coordinate outside the batch: {:?}",
                result.coordinate
            )));
        }
        if !seen.insert(&result.coordinate) {
            return Err(TedError::inference(format!(
                "denoiser returned two results for {:?}",
                result.coordinate
            )));
        }
    }
    Ok(())
}

/// Denoise a stack with caller-supplied normalization statistics.
pub fn denoise_stack_with_params<F, D>(
    volume: ArrayView3<F>,
    config: &StitchConfig<F>,
    params: &NormalizationParams<F>,
    denoiser: &D,
) -> Result<Array3<F>>
where
    F: TedFloat,
    D: Denoiser<F> + ?Sized,
{
    config.validate_for_shape(volume.dim())?;

    let profile_timing = resolve_profile_timing();
    let started = profile_timing.then(Instant::now);
    let batch_size = resolve_batch_size(config.batch_size);

    let coordinates = generate_coordinates(volume.dim(), &config.patch_size, &config.patch_interval)?;
    tracing::info!(
        shape = ?volume.dim(),
        patches = coordinates.len(),
        batch_size,
        mean = ?params.mean,
        std = ?params.std,
        "denoising stack"
    );

    let mut assembler = StitchAssembler::new(volume.dim());
    let mut stats = StageStats::default();

    for (batch_idx, batch) in coordinates.chunks(batch_size).enumerate() {
        let t0 = profile_timing.then(Instant::now);
        let patches = extract_patches(volume, batch, params, config.gradient_scale)?;
        let t1 = profile_timing.then(Instant::now);

        let results = denoiser.denoise_batch(&patches)?;
        check_batch_pairing(batch, &results)?;
        let t2 = profile_timing.then(Instant::now);

        for result in &results {
            assembler.insert(&result.coordinate, result.data.view())?;
        }

        if let (Some(t0), Some(t1), Some(t2)) = (t0, t1, t2) {
            stats.extraction_ns += (t1 - t0).as_nanos();
            stats.inference_ns += (t2 - t1).as_nanos();
            stats.stitch_ns += t2.elapsed().as_nanos();
        }
        stats.batches += 1;
        stats.patches += batch.len() as u64;

        tracing::debug!(
            batch = batch_idx,
            size = batch.len(),
            inserted = assembler.inserted(),
            "stitched batch"
        );
    }

    let output = assembler.finalize(params);

    if let Some(started) = started {
        tracing::info!(
            batches = stats.batches,
            patches = stats.patches,
            extraction_ms = stats.extraction_ns as f64 / 1_000_000.0,
            inference_ms = stats.inference_ns as f64 / 1_000_000.0,
            stitch_ms = stats.stitch_ns as f64 / 1_000_000.0,
            wall_ms = started.elapsed().as_secs_f64() * 1_000.0,
            "ted_profile"
        );
    }

    Ok(output)
}

/// Denoise a full stack with statistics fitted on the stack itself.
///
/// # Arguments
///
/// * `volume` - Input stack (T × H × W)
/// * `config` - Patch geometry, gradient scale and batch size
/// * `denoiser` - Batched model (see [`Denoiser`])
///
/// # Returns
///
/// Stitched, de-normalized stack with the input's shape. Frames no patch
/// centre reaches stay at the volume mean.
///
/// # Example
///
/// ```
/// use ted_core::{denoise_stack, IdentityDenoiser, StitchConfig};
/// use ndarray::Array3;
///
/// let stack = Array3::from_shape_fn((5, 32, 32), |(t, r, c)| (t + r + c) as f32);
/// let config = StitchConfig {
///     patch_size: [3, 16, 16],
///     patch_interval: [1, 8, 8],
///     ..StitchConfig::default()
/// };
/// let result = denoise_stack(stack.view(), &config, &IdentityDenoiser).unwrap();
/// assert_eq!(result.dim(), (5, 32, 32));
/// ```
pub fn denoise_stack<F, D>(volume: ArrayView3<F>, config: &StitchConfig<F>, denoiser: &D) -> Result<Array3<F>>
where
    F: TedFloat,
    D: Denoiser<F> + ?Sized,
{
    let params = NormalizationParams::fit(&volume)?;
    denoise_stack_with_params(volume, config, &params, denoiser)
}
