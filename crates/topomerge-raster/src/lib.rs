//! # topomerge-raster
//!
//! Numeric core for reconciling independently produced elevation rasters.
//!
//! This crate provides:
//! - [`Grid`]: raster dimensions, affine [`GeoTransform`] and [`Crs`] identifier
//! - [`MaskedRaster`]: a single-band sample buffer with explicit per-cell validity
//! - [`align`]: nearest-neighbour resampling of a raster onto another grid
//! - [`combine`]: merging a DEM with a reference surface under a mask, producing
//!   a merged `u16` elevation raster and a trimmed `u8` mask
//!
//! File formats are not handled here; rasters arrive already decoded.
//!
//! ## Example
//!
//! ```
//! use topomerge_raster::{align, combine, Crs, GeoTransform, Grid, MaskedRaster};
//!
//! let grid = Grid::new(2, 1, GeoTransform::north_up(0.0, 10.0, 10.0, 10.0), Crs::from_epsg(4326))?;
//!
//! let dem = MaskedRaster::from_sentinel(grid.clone(), vec![10.0f32, 0.0], Some(-9999.0))?;
//! let reference = MaskedRaster::from_sentinel(grid.clone(), vec![5i16, -32768], Some(-32768))?;
//! let mask = MaskedRaster::from_sentinel(grid.clone(), vec![1u8, 1], Some(0))?;
//!
//! let reference = align(&reference, &grid)?;
//! let output = combine(&dem, &reference, &mask)?;
//! assert_eq!(output.merged.data(), &[10, 0]);
//! assert_eq!(output.trimmed_mask.data(), &[1, 1]);
//! # Ok::<(), topomerge_raster::RasterError>(())
//! ```

mod combine;
mod error;
mod grid;
mod parallel;
mod raster;
mod resample;

pub use combine::{combine, combine_views, combine_with, CombineOutput, CombineStats, MASK_NODATA, MERGED_NODATA};
pub use error::{GridMismatch, RasterError};
pub use grid::{Bounds, Crs, GeoTransform, Grid};
pub use parallel::{ParallelConfig, DEFAULT_MIN_PARALLEL_PIXELS};
pub use raster::{MaskedRaster, RasterView, Sample, SampleType};
pub use resample::{align, align_with};

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
