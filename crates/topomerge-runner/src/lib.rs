//! # topomerge-runner
//!
//! File-level driver for the topomerge tools.
//!
//! - [`align_files`]: resample GeoTIFFs onto the grid of a reference GeoTIFF
//! - [`combine_files`]: merge an aligned DEM and reference surface under a
//!   mask, writing a `uint16` DEM and a `uint8` trimmed mask
//! - [`run_pipeline`]: both steps driven by a [`PipelineConfig`] YAML file
//!
//! The `topomerge` binary exposes the same operations as subcommands.

mod config;
mod error;
mod naming;
mod output;
mod pipeline;

pub use config::{CombineConfig, CompressionSetting, ParallelSettings, PipelineConfig};
pub use error::RunnerError;
pub use naming::aligned_file_name;
pub use pipeline::{align_files, combine_files, run_pipeline, AlignedFile, PipelineReport, RunOptions};

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
