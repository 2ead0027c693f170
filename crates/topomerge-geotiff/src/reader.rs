//! Decoding single-band GeoTIFF files into [`AnyRaster`].

use crate::tags::{read_crs, read_nodata, read_transform};
use crate::{AnyRaster, GeoTiffError, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::ColorType;
use topomerge_raster::{Grid, MaskedRaster, Sample};

/// Read a single-band GeoTIFF.
///
/// The grid comes from the georeferencing tags and the GeoKey directory;
/// cells equal to the GDAL nodata value are marked invalid.
pub fn read_raster<P: AsRef<Path>>(path: P) -> Result<AnyRaster> {
    let path = path.as_ref();
    tracing::debug!("Reading GeoTIFF {}", path.display());

    let file = BufReader::new(File::open(path)?);
    let raster = read_from(file)?;

    tracing::info!(
        "Read {} ({}x{} {}, nodata {:?}, {} valid cells)",
        path.display(),
        raster.grid().width(),
        raster.grid().height(),
        raster.sample_type(),
        raster.nodata(),
        raster.valid_count()
    );
    Ok(raster)
}

/// Read a single-band GeoTIFF from any seekable stream.
pub fn read_from<R: Read + Seek>(reader: R) -> Result<AnyRaster> {
    let mut decoder = Decoder::new(reader)?;

    // Full-resolution DEMs exceed the default decoder limits
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024; // 1 GB
    limits.intermediate_buffer_size = 1024 * 1024 * 1024; // 1 GB
    limits.ifd_value_size = 1024 * 1024 * 1024;
    decoder = decoder.with_limits(limits);

    match decoder.colortype()? {
        ColorType::Gray(_) => {}
        other => {
            return Err(GeoTiffError::UnsupportedDataType(format!(
                "expected a single band, found {:?}",
                other
            )))
        }
    }

    let (width, height) = decoder.dimensions()?;
    let transform = read_transform(&mut decoder)?;
    let crs = read_crs(&mut decoder)?;
    let nodata = read_nodata(&mut decoder)?;
    let grid = Grid::new(width as usize, height as usize, transform, crs)?;

    tracing::debug!(
        "Grid {}x{}, transform {:?}, crs {}",
        width,
        height,
        grid.transform().coefficients(),
        grid.crs()
    );

    let raster = match decoder.read_image()? {
        DecodingResult::U8(data) => AnyRaster::from(build(grid, data, nodata)?),
        DecodingResult::U16(data) => AnyRaster::from(build(grid, data, nodata)?),
        DecodingResult::I16(data) => AnyRaster::from(build(grid, data, nodata)?),
        DecodingResult::U32(data) => AnyRaster::from(build(grid, data, nodata)?),
        DecodingResult::I32(data) => AnyRaster::from(build(grid, data, nodata)?),
        DecodingResult::F32(data) => AnyRaster::from(build(grid, data, nodata)?),
        DecodingResult::F64(data) => AnyRaster::from(build(grid, data, nodata)?),
        _ => {
            return Err(GeoTiffError::UnsupportedDataType(
                "sample format is not one of uint8, uint16, int16, uint32, int32, float32, float64"
                    .to_string(),
            ))
        }
    };

    Ok(raster)
}

fn build<T: Sample>(grid: Grid, data: Vec<T>, nodata: Option<f64>) -> Result<MaskedRaster<T>> {
    let sentinel = nodata.and_then(|value| {
        let cast = T::from_f64(value);
        if cast.to_f64() == value || (value.is_nan() && cast.to_f64().is_nan()) {
            Some(cast)
        } else {
            tracing::warn!(
                "Nodata value {} is not representable as {}, ignoring it",
                value,
                T::SAMPLE_TYPE
            );
            None
        }
    });

    Ok(MaskedRaster::from_sentinel(grid, data, sentinel)?)
}
