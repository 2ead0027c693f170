//! Mapping between raster element types and TIFF sample layouts.

use tiff::encoder::colortype;
use topomerge_raster::{Grid, MaskedRaster, RasterView, Sample, SampleType};

/// A [`Sample`] type that has a single-channel TIFF encoding.
pub trait TiffSample: Sample {
    /// Encoder colour type whose samples are `Self`.
    type Color: colortype::ColorType<Inner = Self>;
}

impl TiffSample for u8 {
    type Color = colortype::Gray8;
}

impl TiffSample for u16 {
    type Color = colortype::Gray16;
}

impl TiffSample for i16 {
    type Color = colortype::GrayI16;
}

impl TiffSample for u32 {
    type Color = colortype::Gray32;
}

impl TiffSample for i32 {
    type Color = colortype::GrayI32;
}

impl TiffSample for f32 {
    type Color = colortype::Gray32Float;
}

impl TiffSample for f64 {
    type Color = colortype::Gray64Float;
}

/// A decoded raster of any supported element type.
///
/// Use [`dispatch!`](crate::dispatch) to run generic code on the inner
/// [`MaskedRaster`].
#[derive(Debug, Clone, PartialEq)]
pub enum AnyRaster {
    /// Unsigned 8-bit samples.
    U8(MaskedRaster<u8>),
    /// Unsigned 16-bit samples.
    U16(MaskedRaster<u16>),
    /// Signed 16-bit samples.
    I16(MaskedRaster<i16>),
    /// Unsigned 32-bit samples.
    U32(MaskedRaster<u32>),
    /// Signed 32-bit samples.
    I32(MaskedRaster<i32>),
    /// 32-bit float samples.
    F32(MaskedRaster<f32>),
    /// 64-bit float samples.
    F64(MaskedRaster<f64>),
}

/// Evaluate an expression against the [`MaskedRaster`] inside an [`AnyRaster`].
///
/// The identifier is bound to the inner raster (by reference when the
/// scrutinee is a reference) in every arm, so the body is compiled once per
/// element type.
///
/// ```
/// use topomerge_geotiff::{dispatch, AnyRaster};
/// use topomerge_raster::{Crs, GeoTransform, Grid, MaskedRaster};
///
/// let grid = Grid::new(2, 1, GeoTransform::north_up(0.0, 1.0, 1.0, 1.0), Crs::unspecified())?;
/// let any = AnyRaster::from(MaskedRaster::filled(grid, 3i16, None));
/// let valid = dispatch!(&any, raster => raster.valid_count());
/// assert_eq!(valid, 2);
/// # Ok::<(), topomerge_raster::RasterError>(())
/// ```
#[macro_export]
macro_rules! dispatch {
    ($any:expr, $raster:ident => $body:expr) => {
        match $any {
            $crate::AnyRaster::U8($raster) => $body,
            $crate::AnyRaster::U16($raster) => $body,
            $crate::AnyRaster::I16($raster) => $body,
            $crate::AnyRaster::U32($raster) => $body,
            $crate::AnyRaster::I32($raster) => $body,
            $crate::AnyRaster::F32($raster) => $body,
            $crate::AnyRaster::F64($raster) => $body,
        }
    };
}

macro_rules! impl_from_masked {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<MaskedRaster<$t>> for AnyRaster {
                fn from(raster: MaskedRaster<$t>) -> Self {
                    AnyRaster::$variant(raster)
                }
            }
        )*
    };
}

impl_from_masked!(u8 => U8, u16 => U16, i16 => I16, u32 => U32, i32 => I32, f32 => F32, f64 => F64);

impl AnyRaster {
    /// Grid of the inner raster.
    pub fn grid(&self) -> &Grid {
        dispatch!(self, raster => raster.grid())
    }

    /// Element type of the inner raster.
    pub fn sample_type(&self) -> SampleType {
        match self {
            AnyRaster::U8(_) => SampleType::U8,
            AnyRaster::U16(_) => SampleType::U16,
            AnyRaster::I16(_) => SampleType::I16,
            AnyRaster::U32(_) => SampleType::U32,
            AnyRaster::I32(_) => SampleType::I32,
            AnyRaster::F32(_) => SampleType::F32,
            AnyRaster::F64(_) => SampleType::F64,
        }
    }

    /// Number of valid cells.
    pub fn valid_count(&self) -> usize {
        dispatch!(self, raster => raster.valid_count())
    }

    /// Declared nodata sentinel, widened to `f64`.
    pub fn nodata(&self) -> Option<f64> {
        dispatch!(self, raster => raster.nodata().map(Sample::to_f64))
    }

    /// The inner raster behind a type-erased view.
    pub fn as_view(&self) -> &dyn RasterView {
        dispatch!(self, raster => raster as &dyn RasterView)
    }
}
