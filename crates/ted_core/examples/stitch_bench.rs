//! Wall-clock run of the full identity pipeline on a synthetic stack.
//!
//! Run with: cargo run --release -p ted_core --example stitch_bench -- --frames 41 --rows 1024
//! Set `RUST_LOG=ted_core=debug` for per-batch events.

use clap::Parser;
use ndarray::Array3;
use rand::prelude::*;
use std::time::Instant;
use ted_core::{denoise_stack, to_u8_stack, IdentityDenoiser, StitchConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stitch_bench")]
#[command(about = "Time tiling, extraction and stitching of one synthetic stack")]
struct Args {
    /// Frames in the synthetic stack
    #[arg(long, default_value_t = 41)]
    frames: usize,

    /// Rows per frame
    #[arg(long, default_value_t = 512)]
    rows: usize,

    /// Columns per frame
    #[arg(long, default_value_t = 512)]
    cols: usize,

    /// Temporal patch extent
    #[arg(long, default_value_t = 21)]
    patch_t: usize,

    /// Spatial patch extent (square)
    #[arg(long, default_value_t = 128)]
    patch_hw: usize,

    /// Spatial stride between patches
    #[arg(long, default_value_t = 64)]
    interval_hw: usize,

    /// Patches per denoiser call
    #[arg(long, default_value_t = 180)]
    batch: usize,

    /// Seed for the synthetic data
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> ted_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = StitchConfig::<f32> {
        patch_size: [args.patch_t, args.patch_hw, args.patch_hw],
        patch_interval: [1, args.interval_hw, args.interval_hw],
        batch_size: args.batch,
        ..StitchConfig::default()
    };
    tracing::info!(
        frames = args.frames,
        rows = args.rows,
        cols = args.cols,
        patch_size = ?config.patch_size,
        patch_interval = ?config.patch_interval,
        batch_size = config.batch_size,
        "stitch bench start"
    );

    let mut rng = StdRng::seed_from_u64(args.seed);
    let stack = Array3::from_shape_fn((args.frames, args.rows, args.cols), |_| {
        rng.gen::<f32>() * 255.0
    });

    let started = Instant::now();
    let denoised = denoise_stack(stack.view(), &config, &IdentityDenoiser)?;
    let elapsed = started.elapsed();

    let exported = to_u8_stack(denoised.view(), args.patch_t)?;
    let checksum: u64 = exported.iter().map(|&v| v as u64).sum();

    println!(
        "elapsed_s={:.3} exported_frames={} checksum={}",
        elapsed.as_secs_f64(),
        exported.dim().0,
        checksum
    );
    Ok(())
}
