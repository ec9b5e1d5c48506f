//! TeD Core Library
//!
//! Patch tiling, temporal-gradient confidence maps and centre-frame stitching
//! for denoising volumetric time-series microscopy stacks with a patch-based
//! model. The model itself sits behind the [`Denoiser`] trait; this crate
//! decides where patches go, what the model sees, and how its output is put
//! back together.

pub mod config;
pub mod coordinates;
pub mod error;
pub mod export;
pub mod extraction;
pub mod filtering;
pub mod float_trait;
pub mod gradient_map;
pub mod inference;
pub mod normalization;
pub mod pipeline;
pub mod sampling;
pub mod stitching;

// Re-export commonly used types at the crate root
pub use config::StitchConfig;
pub use coordinates::{
    axis_tiles, generate_coordinates, time_starts, written_frame_range, AxisTile, Coordinate,
};
pub use error::{Result, TedError};
pub use export::to_u8_stack;
pub use extraction::{extract_patch, extract_patches, Patch};
pub use float_trait::TedFloat;
pub use gradient_map::temporal_gradient_map;
pub use inference::{DenoisedPatch, Denoiser, IdentityDenoiser};
pub use normalization::NormalizationParams;
pub use pipeline::{denoise_stack, denoise_stack_with_params};
pub use sampling::{PatchSampler, TrainingSample};
pub use stitching::StitchAssembler;
