//! Error types for the runner.

use std::path::PathBuf;
use thiserror::Error;
use topomerge_geotiff::GeoTiffError;
use topomerge_raster::RasterError;

/// Errors that can occur while running a pipeline.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Alignment or combination failed.
    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),

    /// A GeoTIFF could not be read or written.
    #[error("GeoTIFF error: {0}")]
    GeoTiff(#[from] GeoTiffError),

    /// I/O error outside GeoTIFF decoding, such as creating the output directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Pipeline file is not valid YAML for [`PipelineConfig`](crate::PipelineConfig).
    #[error("Config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Pipeline file parsed but describes an unusable run.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Two outputs of one step would be written to the same file.
    #[error("Two outputs would be written to {}", .0.display())]
    DuplicateOutput(PathBuf),

    /// An output path would overwrite one of the inputs.
    #[error("Refusing to overwrite input file {}", .0.display())]
    WouldOverwriteInput(PathBuf),
}
