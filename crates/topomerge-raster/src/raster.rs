//! Single-band sample buffers paired with explicit per-cell validity.

use crate::{Grid, RasterError, Result};
use std::fmt;

/// Element type tag for a sample buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    /// Unsigned 8-bit integer.
    U8,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 32-bit integer.
    I32,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleType::U8 => "uint8",
            SampleType::U16 => "uint16",
            SampleType::I16 => "int16",
            SampleType::U32 => "uint32",
            SampleType::I32 => "int32",
            SampleType::F32 => "float32",
            SampleType::F64 => "float64",
        };
        f.write_str(name)
    }
}

/// Numeric element of a raster band.
pub trait Sample: Copy + PartialEq + PartialOrd + Send + Sync + fmt::Debug + fmt::Display + 'static {
    /// Runtime tag of this type.
    const SAMPLE_TYPE: SampleType;
    /// Zero, used as fill when a raster has no nodata sentinel.
    const ZERO: Self;

    /// Widen to `f64` for cross-type comparisons.
    fn to_f64(self) -> f64;

    /// Narrow from `f64`, saturating at the type's limits (NaN becomes zero
    /// for integer types).
    fn from_f64(value: f64) -> Self;

    /// True if this value is the nodata sentinel.
    fn is_nodata(self, nodata: Self) -> bool {
        self == nodata
    }
}

macro_rules! impl_int_sample {
    ($($t:ty => $tag:ident),* $(,)?) => {
        $(
            impl Sample for $t {
                const SAMPLE_TYPE: SampleType = SampleType::$tag;
                const ZERO: Self = 0;

                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn from_f64(value: f64) -> Self {
                    value as $t
                }
            }
        )*
    };
}

macro_rules! impl_float_sample {
    ($($t:ty => $tag:ident),* $(,)?) => {
        $(
            impl Sample for $t {
                const SAMPLE_TYPE: SampleType = SampleType::$tag;
                const ZERO: Self = 0.0;

                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn from_f64(value: f64) -> Self {
                    value as $t
                }

                // NaN sentinels never compare equal, so match them explicitly.
                fn is_nodata(self, nodata: Self) -> bool {
                    self == nodata || (self.is_nan() && nodata.is_nan())
                }
            }
        )*
    };
}

impl_int_sample!(u8 => U8, u16 => U16, i16 => I16, u32 => U32, i32 => I32);
impl_float_sample!(f32 => F32, f64 => F64);

/// A single-band raster: samples, validity flags and the nodata sentinel,
/// defined on a [`Grid`].
///
/// The validity buffer is authoritative. The sentinel only matters when the
/// raster is decoded from or encoded to a file; see [`MaskedRaster::to_filled_vec`].
/// A `MaskedRaster` is never modified after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedRaster<T: Sample> {
    grid: Grid,
    data: Vec<T>,
    valid: Vec<bool>,
    nodata: Option<T>,
}

impl<T: Sample> MaskedRaster<T> {
    /// Create a raster from explicit data and validity buffers.
    pub fn new(grid: Grid, data: Vec<T>, valid: Vec<bool>, nodata: Option<T>) -> Result<Self> {
        let expected = grid.len();
        if data.len() != expected || valid.len() != expected {
            return Err(RasterError::ShapeMismatch {
                expected,
                data: data.len(),
                valid: valid.len(),
            });
        }

        Ok(Self::from_parts(grid, data, valid, nodata))
    }

    /// Create a raster whose validity is derived from the nodata sentinel.
    ///
    /// Without a sentinel every cell is valid.
    pub fn from_sentinel(grid: Grid, data: Vec<T>, nodata: Option<T>) -> Result<Self> {
        let valid = match nodata {
            Some(nodata) => data.iter().map(|v| !v.is_nodata(nodata)).collect(),
            None => vec![true; data.len()],
        };
        Self::new(grid, data, valid, nodata)
    }

    /// Create a raster where every cell is valid and holds `value`.
    pub fn filled(grid: Grid, value: T, nodata: Option<T>) -> Self {
        let len = grid.len();
        Self::from_parts(grid, vec![value; len], vec![true; len], nodata)
    }

    /// Assemble a raster whose buffer lengths the caller has already ensured.
    pub(crate) fn from_parts(grid: Grid, data: Vec<T>, valid: Vec<bool>, nodata: Option<T>) -> Self {
        debug_assert_eq!(data.len(), grid.len());
        debug_assert_eq!(valid.len(), grid.len());
        Self {
            grid,
            data,
            valid,
            nodata,
        }
    }

    /// Grid the raster is defined on.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Raw samples, row-major. Values at invalid cells are unspecified.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Validity flags, parallel to `data`.
    pub fn valid(&self) -> &[bool] {
        &self.valid
    }

    /// Declared nodata sentinel.
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Value written into cells that hold no data.
    pub fn fill_value(&self) -> T {
        self.nodata.unwrap_or(T::ZERO)
    }

    /// Value of a pixel, or `None` if it is invalid or outside the grid.
    pub fn get(&self, col: usize, row: usize) -> Option<T> {
        if col >= self.grid.width() || row >= self.grid.height() {
            return None;
        }
        let idx = self.grid.index(col, row);
        self.valid[idx].then(|| self.data[idx])
    }

    /// Number of valid cells.
    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }

    /// Samples with the nodata sentinel written into every invalid cell.
    pub fn to_filled_vec(&self) -> Vec<T> {
        let fill = self.fill_value();
        self.data
            .iter()
            .zip(&self.valid)
            .map(|(&value, &valid)| if valid { value } else { fill })
            .collect()
    }

    /// Same samples and validity, declared with a different sentinel.
    pub fn with_nodata(&self, nodata: Option<T>) -> Self {
        Self::from_parts(self.grid.clone(), self.data.clone(), self.valid.clone(), nodata)
    }

    /// Decompose into grid, data, validity and sentinel.
    pub fn into_parts(self) -> (Grid, Vec<T>, Vec<bool>, Option<T>) {
        (self.grid, self.data, self.valid, self.nodata)
    }
}

/// Cell access with values widened to `f64`.
///
/// Object safe, so rasters whose element type is only known at run time can
/// share one code path through `&dyn RasterView`.
pub trait RasterView: Sync {
    /// Grid the raster is defined on.
    fn grid(&self) -> &Grid;

    /// Sample at a buffer index, widened to `f64`.
    fn value(&self, index: usize) -> f64;

    /// Validity flag at a buffer index.
    fn is_valid(&self, index: usize) -> bool;

    /// Lengths of the sample and validity buffers.
    fn buffer_lens(&self) -> (usize, usize);
}

impl<T: Sample> RasterView for MaskedRaster<T> {
    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn value(&self, index: usize) -> f64 {
        self.data[index].to_f64()
    }

    fn is_valid(&self, index: usize) -> bool {
        self.valid[index]
    }

    fn buffer_lens(&self) -> (usize, usize) {
        (self.data.len(), self.valid.len())
    }
}
