//! Error types for the raster crate.

use std::fmt;
use thiserror::Error;

/// Errors that can occur when building grids or processing rasters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RasterError {
    /// The affine transform of a grid cannot be inverted.
    #[error("Affine transform is not invertible (determinant {determinant})")]
    SingularTransform {
        /// Determinant of the linear part of the transform.
        determinant: f64,
    },

    /// A grid was declared with a zero dimension.
    #[error("Invalid grid dimensions {width}x{height} (both must be positive)")]
    InvalidDimensions {
        /// Requested width in pixels.
        width: usize,
        /// Requested height in pixels.
        height: usize,
    },

    /// Rasters that must share a grid do not.
    #[error("Rasters '{left}' and '{right}' are not aligned: {mismatch}")]
    MisalignedInputs {
        /// Name of the raster whose grid was used as the reference.
        left: &'static str,
        /// Name of the raster that differs from it.
        right: &'static str,
        /// Which parts of the grid differ.
        mismatch: GridMismatch,
    },

    /// A sample or validity buffer does not match its grid's size.
    #[error("Buffer length mismatch: grid has {expected} cells, data has {data}, validity has {valid}")]
    ShapeMismatch {
        /// `width * height` of the grid.
        expected: usize,
        /// Length of the data buffer.
        data: usize,
        /// Length of the validity buffer.
        valid: usize,
    },
}

/// The fields in which two grids differ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridMismatch {
    /// Widths differ.
    pub width: bool,
    /// Heights differ.
    pub height: bool,
    /// Affine transforms differ.
    pub transform: bool,
    /// Coordinate reference identifiers differ.
    pub crs: bool,
}

impl GridMismatch {
    /// True if any field differs.
    pub fn any(&self) -> bool {
        self.width || self.height || self.transform || self.crs
    }
}

impl fmt::Display for GridMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = [
            (self.width, "width"),
            (self.height, "height"),
            (self.transform, "transform"),
            (self.crs, "crs"),
        ]
        .iter()
        .filter(|(differs, _)| *differs)
        .map(|(_, name)| *name)
        .collect();

        if fields.is_empty() {
            write!(f, "no differences")
        } else {
            write!(f, "{} differ", fields.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_display_lists_fields() {
        let mismatch = GridMismatch {
            width: true,
            crs: true,
            ..Default::default()
        };
        assert_eq!(mismatch.to_string(), "width, crs differ");
        assert!(mismatch.any());
        assert!(!GridMismatch::default().any());
    }
}
