//! Spatial frame of a raster: dimensions, affine transform and coordinate reference.

use crate::{GridMismatch, RasterError, Result};
use std::fmt;

/// GeoKey ids used when building or inspecting a GeoKey directory.
const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

/// GeoKey value meaning "user defined" rather than an EPSG code.
const USER_DEFINED: u16 = 32767;

/// Six-coefficient affine transform from pixel to world coordinates.
///
/// Coefficients use the GDAL ordering:
///
/// * `[0]`: x of the upper-left corner of the upper-left pixel
/// * `[1]`: pixel width (W-E resolution)
/// * `[2]`: row rotation
/// * `[3]`: y of the upper-left corner of the upper-left pixel
/// * `[4]`: column rotation
/// * `[5]`: pixel height (negative for north-up rasters)
///
/// Pixel coordinates are continuous: pixel `(col, row)` covers
/// `[col, col+1) x [row, row+1)`, so its centre is at `(col + 0.5, row + 0.5)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// Build a north-up transform without rotation.
    ///
    /// `pixel_height` is the positive size of a pixel along y; it is stored
    /// negated because rows advance southwards.
    pub fn north_up(x_origin: f64, y_origin: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self([x_origin, pixel_width, 0.0, y_origin, 0.0, -pixel_height])
    }

    /// Coefficients in GDAL order.
    pub fn coefficients(&self) -> [f64; 6] {
        self.0
    }

    /// Map a (possibly fractional) pixel coordinate to world coordinates.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let c = &self.0;
        (c[0] + col * c[1] + row * c[2], c[3] + col * c[4] + row * c[5])
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        self.0[1] * self.0[5] - self.0[2] * self.0[4]
    }

    /// True if the transform has no rotation terms.
    pub fn is_rectilinear(&self) -> bool {
        self.0[2] == 0.0 && self.0[4] == 0.0
    }

    /// Compute the inverse transform (world to pixel).
    pub fn invert(&self) -> Result<GeoTransform> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(RasterError::SingularTransform { determinant: det });
        }

        let c = &self.0;
        let inv_det = 1.0 / det;
        let a = c[5] * inv_det;
        let b = -c[2] * inv_det;
        let d = -c[4] * inv_det;
        let e = c[1] * inv_det;

        Ok(GeoTransform([
            -(a * c[0] + b * c[3]),
            a,
            b,
            -(d * c[0] + e * c[3]),
            d,
            e,
        ]))
    }
}

/// Opaque coordinate reference identifier.
///
/// Holds the GeoTIFF GeoKey directory and its parameter blocks exactly as they
/// were read, so a CRS survives a read/write round trip without being
/// interpreted. Two rasters are on the same reference system only if their
/// identifiers are equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Crs {
    geo_keys: Vec<u16>,
    double_params: Vec<f64>,
    ascii_params: String,
}

impl Crs {
    /// The empty identifier, for rasters without georeferencing keys.
    pub fn unspecified() -> Self {
        Self::default()
    }

    /// Wrap raw GeoKey directory contents.
    pub fn from_geo_keys(geo_keys: Vec<u16>, double_params: Vec<f64>, ascii_params: String) -> Self {
        Self {
            geo_keys,
            double_params,
            ascii_params,
        }
    }

    /// Build a minimal GeoKey directory for an EPSG code.
    ///
    /// Codes in the 4000-4999 range are treated as geographic systems,
    /// everything else as projected.
    pub fn from_epsg(code: u16) -> Self {
        let geographic = (4000..5000).contains(&code);
        let (model_type, cs_key) = if geographic {
            (2, GEOGRAPHIC_TYPE_KEY)
        } else {
            (1, PROJECTED_CS_TYPE_KEY)
        };

        let geo_keys = vec![
            1, 1, 0, 3, // header: version, revision, minor revision, key count
            GT_MODEL_TYPE_KEY, 0, 1, model_type,
            GT_RASTER_TYPE_KEY, 0, 1, 1, // PixelIsArea
            cs_key, 0, 1, code,
        ];

        Self::from_geo_keys(geo_keys, Vec::new(), String::new())
    }

    /// True if no GeoKeys are present.
    pub fn is_unspecified(&self) -> bool {
        self.geo_keys.is_empty()
    }

    /// Raw GeoKey directory.
    pub fn geo_keys(&self) -> &[u16] {
        &self.geo_keys
    }

    /// Raw GeoDoubleParams block.
    pub fn double_params(&self) -> &[f64] {
        &self.double_params
    }

    /// Raw GeoAsciiParams block.
    pub fn ascii_params(&self) -> &str {
        &self.ascii_params
    }

    /// EPSG code of the projected or geographic system, if the directory names one.
    pub fn epsg(&self) -> Option<u16> {
        let projected = self.geo_key(PROJECTED_CS_TYPE_KEY);
        let geographic = self.geo_key(GEOGRAPHIC_TYPE_KEY);
        projected
            .or(geographic)
            .filter(|&code| code != 0 && code != USER_DEFINED)
    }

    /// Value of a short key stored inline in the directory.
    pub fn geo_key(&self, key_id: u16) -> Option<u16> {
        let count = *self.geo_keys.get(3)? as usize;
        self.geo_keys
            .get(4..)?
            .chunks_exact(4)
            .take(count)
            .find(|entry| entry[0] == key_id && entry[1] == 0)
            .map(|entry| entry[3])
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg() {
            Some(code) => write!(f, "EPSG:{}", code),
            None if self.is_unspecified() => write!(f, "unspecified"),
            None => write!(f, "custom ({} geokey words)", self.geo_keys.len()),
        }
    }
}

/// World-coordinate extent of a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum x (west edge for north-up grids).
    pub min_x: f64,
    /// Minimum y (south edge for north-up grids).
    pub min_y: f64,
    /// Maximum x.
    pub max_x: f64,
    /// Maximum y.
    pub max_y: f64,
}

/// Dimensions, affine transform and CRS of a raster.
///
/// The inverse transform is computed once in [`Grid::new`]; a `Grid` value
/// therefore always has an invertible transform and positive dimensions.
#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    transform: GeoTransform,
    inverse: GeoTransform,
    crs: Crs,
}

impl Grid {
    /// Create a grid, checking dimensions and invertibility.
    pub fn new(width: usize, height: usize, transform: GeoTransform, crs: Crs) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidDimensions { width, height });
        }
        let inverse = transform.invert()?;

        Ok(Self {
            width,
            height,
            transform,
            inverse,
            crs,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells (`width * height`).
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// True if the grid has no cells. [`Grid::new`] rejects zero dimensions,
    /// so a constructed grid is never empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pixel-to-world transform.
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Coordinate reference identifier.
    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Row-major buffer index of a pixel.
    pub fn index(&self, col: usize, row: usize) -> usize {
        row * self.width + col
    }

    /// World coordinates of a (fractional) pixel coordinate.
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        self.transform.apply(col, row)
    }

    /// Fractional pixel coordinates of a world coordinate.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.inverse.apply(x, y)
    }

    /// World extent covered by the grid's four corners.
    pub fn bounds(&self) -> Bounds {
        let (w, h) = (self.width as f64, self.height as f64);
        let corners = [
            self.pixel_to_world(0.0, 0.0),
            self.pixel_to_world(w, 0.0),
            self.pixel_to_world(0.0, h),
            self.pixel_to_world(w, h),
        ];

        corners.iter().fold(
            Bounds {
                min_x: f64::INFINITY,
                min_y: f64::INFINITY,
                max_x: f64::NEG_INFINITY,
                max_y: f64::NEG_INFINITY,
            },
            |b, &(x, y)| Bounds {
                min_x: b.min_x.min(x),
                min_y: b.min_y.min(y),
                max_x: b.max_x.max(x),
                max_y: b.max_y.max(y),
            },
        )
    }

    /// Compare against another grid, returning the differing fields if any.
    pub fn mismatch(&self, other: &Grid) -> Option<GridMismatch> {
        let mismatch = GridMismatch {
            width: self.width != other.width,
            height: self.height != other.height,
            transform: self.transform != other.transform,
            crs: self.crs != other.crs,
        };
        mismatch.any().then_some(mismatch)
    }
}

impl PartialEq for Grid {
    fn eq(&self, other: &Self) -> bool {
        self.mismatch(other).is_none()
    }
}
