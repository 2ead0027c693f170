//! Encoding [`MaskedRaster`]s as single-band GeoTIFF files.

use crate::sample::TiffSample;
use crate::tags::{
    format_nodata, GeoreferenceTags, GDAL_NODATA, GEO_ASCII_PARAMS, GEO_DOUBLE_PARAMS,
    GEO_KEY_DIRECTORY, MODEL_PIXEL_SCALE, MODEL_TIEPOINT, MODEL_TRANSFORMATION,
};
use crate::{dispatch, AnyRaster, Result};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use tiff::encoder::compression::{self, Deflate, Lzw, Uncompressed};
use tiff::encoder::{TiffEncoder, TiffValue};
use topomerge_raster::{MaskedRaster, Sample};

/// Strip compression applied when encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Raw samples.
    None,
    /// LZW, the usual choice for DEM tiles.
    #[default]
    Lzw,
    /// Deflate at the encoder's balanced level.
    Deflate,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Lzw => write!(f, "lzw"),
            Compression::Deflate => write!(f, "deflate"),
        }
    }
}

/// Options for [`write_raster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    /// Compression of the image strips.
    pub compression: Compression,
}

impl WriteOptions {
    /// Options with the given compression.
    pub fn with_compression(compression: Compression) -> Self {
        Self { compression }
    }
}

/// Write a raster to a GeoTIFF file.
///
/// Invalid cells are written as the raster's nodata value (zero when it has
/// none) and the nodata value is recorded in the `GDAL_NODATA` tag.
pub fn write_raster<T, P>(path: P, raster: &MaskedRaster<T>, options: &WriteOptions) -> Result<()>
where
    T: TiffSample,
    [T]: TiffValue,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_to(&mut writer, raster, options)?;
    writer.flush()?;

    tracing::info!(
        "Wrote {} ({}x{} {}, {} compression)",
        path.display(),
        raster.grid().width(),
        raster.grid().height(),
        T::SAMPLE_TYPE,
        options.compression
    );
    Ok(())
}

/// Write a raster of whatever element type the [`AnyRaster`] holds.
pub fn write_any<P: AsRef<Path>>(path: P, raster: &AnyRaster, options: &WriteOptions) -> Result<()> {
    dispatch!(raster, inner => write_raster(path, inner, options))
}

/// Encode a raster as a GeoTIFF into any seekable stream.
pub fn write_to<W, T>(writer: W, raster: &MaskedRaster<T>, options: &WriteOptions) -> Result<()>
where
    W: Write + Seek,
    T: TiffSample,
    [T]: TiffValue,
{
    let mut encoder = TiffEncoder::new(writer)?;
    match options.compression {
        Compression::None => encode(&mut encoder, raster, Uncompressed),
        Compression::Lzw => encode(&mut encoder, raster, Lzw),
        Compression::Deflate => encode(&mut encoder, raster, Deflate::default()),
    }
}

fn encode<W, T, D>(encoder: &mut TiffEncoder<W>, raster: &MaskedRaster<T>, compression: D) -> Result<()>
where
    W: Write + Seek,
    T: TiffSample,
    [T]: TiffValue,
    D: compression::Compression,
{
    let grid = raster.grid();
    let mut image = encoder.new_image_with_compression::<T::Color, D>(
        grid.width() as u32,
        grid.height() as u32,
        compression,
    )?;

    match GeoreferenceTags::for_transform(grid.transform()) {
        GeoreferenceTags::TiepointScale { tiepoint, scale } => {
            image.encoder().write_tag(MODEL_TIEPOINT, &tiepoint[..])?;
            image.encoder().write_tag(MODEL_PIXEL_SCALE, &scale[..])?;
        }
        GeoreferenceTags::Transformation(matrix) => {
            image.encoder().write_tag(MODEL_TRANSFORMATION, &matrix[..])?;
        }
    }

    let crs = grid.crs();
    if !crs.is_unspecified() {
        image.encoder().write_tag(GEO_KEY_DIRECTORY, crs.geo_keys())?;
        if !crs.double_params().is_empty() {
            image.encoder().write_tag(GEO_DOUBLE_PARAMS, crs.double_params())?;
        }
        if !crs.ascii_params().is_empty() {
            image.encoder().write_tag(GEO_ASCII_PARAMS, crs.ascii_params())?;
        }
    }

    match raster.nodata() {
        Some(nodata) => {
            let text = format_nodata(nodata.to_f64());
            image.encoder().write_tag(GDAL_NODATA, text.as_str())?;
        }
        None if raster.valid_count() < grid.len() => {
            tracing::warn!(
                "Raster has {} invalid cells but no nodata value; they are written as 0",
                grid.len() - raster.valid_count()
            );
        }
        None => {}
    }

    let data = raster.to_filled_vec();
    image.write_data(&data)?;
    Ok(())
}
