//! # topomerge-geotiff
//!
//! Single-band GeoTIFF input and output for [`topomerge_raster`].
//!
//! Files are decoded with the `tiff` crate into an [`AnyRaster`] that keeps
//! the on-disk element type. The grid is built from the GeoTIFF
//! georeferencing tags (`ModelTransformationTag`, or `ModelTiepointTag` plus
//! `ModelPixelScaleTag`) and the GeoKey directory, and cells matching the
//! `GDAL_NODATA` value are marked invalid.
//!
//! ## Example
//!
//! ```no_run
//! use topomerge_geotiff::{dispatch, read_raster, write_any, AnyRaster, WriteOptions};
//!
//! let reference = read_raster("reference.tif")?;
//! let source = read_raster("dem_normalized.tif")?;
//!
//! let aligned: AnyRaster = dispatch!(&source, raster => {
//!     AnyRaster::from(topomerge_raster::align(raster, reference.grid())?)
//! });
//! write_any("dem_aligned.tif", &aligned, &WriteOptions::default())?;
//! # Ok::<(), topomerge_geotiff::GeoTiffError>(())
//! ```

mod error;
mod reader;
mod sample;
pub mod tags;
mod writer;

pub use error::GeoTiffError;
pub use reader::{read_from, read_raster};
pub use sample::{AnyRaster, TiffSample};
pub use writer::{write_any, write_raster, write_to, Compression, WriteOptions};

/// Result type for GeoTIFF operations.
pub type Result<T> = std::result::Result<T, GeoTiffError>;
