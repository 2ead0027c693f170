//! Error types for the GeoTIFF crate.

use thiserror::Error;
use topomerge_raster::RasterError;

/// Errors that can occur when reading or writing GeoTIFF rasters.
#[derive(Debug, Error)]
pub enum GeoTiffError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding or encoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Decoded data does not form a valid raster.
    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),

    /// Invalid GeoTIFF - missing or malformed georeferencing tags.
    #[error("Invalid GeoTIFF: {0}")]
    InvalidGeoTiff(String),

    /// Unsupported data type or layout in the TIFF file.
    #[error("Unsupported TIFF data type: {0}")]
    UnsupportedDataType(String),
}
