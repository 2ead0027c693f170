//! GeoTIFF and GDAL private tags.

use crate::{GeoTiffError, Result};
use std::io::{Read, Seek};
use tiff::decoder::Decoder;
use tiff::tags::Tag;
use topomerge_raster::{Crs, GeoTransform};

/// ModelPixelScaleTag (33550): `[scale_x, scale_y, scale_z]`.
pub const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
/// ModelTiepointTag (33922): `[i, j, k, x, y, z]` per tie point.
pub const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
/// ModelTransformationTag (34264): 4x4 row-major matrix.
pub const MODEL_TRANSFORMATION: Tag = Tag::ModelTransformationTag;
/// GeoKeyDirectoryTag (34735).
pub const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag;
/// GeoDoubleParamsTag (34736).
pub const GEO_DOUBLE_PARAMS: Tag = Tag::GeoDoubleParamsTag;
/// GeoAsciiParamsTag (34737).
pub const GEO_ASCII_PARAMS: Tag = Tag::GeoAsciiParamsTag;
/// GDAL_NODATA (42113), stored as an ASCII string.
pub const GDAL_NODATA: Tag = Tag::GdalNodata;

/// Read the pixel-to-world transform.
///
/// A ModelTransformation matrix takes precedence; otherwise the first tie
/// point and the pixel scale are combined into a north-up transform.
pub fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    if let Some(matrix) = decoder.find_tag(MODEL_TRANSFORMATION)? {
        let m = matrix.into_f64_vec()?;
        if m.len() < 8 {
            return Err(GeoTiffError::InvalidGeoTiff(format!(
                "ModelTransformation has {} values, expected 16",
                m.len()
            )));
        }
        return Ok(GeoTransform([m[3], m[0], m[1], m[7], m[4], m[5]]));
    }

    let tiepoint = decoder.find_tag(MODEL_TIEPOINT)?;
    let pixel_scale = decoder.find_tag(MODEL_PIXEL_SCALE)?;

    match (tiepoint, pixel_scale) {
        (Some(tiepoint), Some(scale)) => {
            let tiepoint = tiepoint.into_f64_vec()?;
            let scale = scale.into_f64_vec()?;
            if tiepoint.len() < 6 || scale.len() < 2 {
                return Err(GeoTiffError::InvalidGeoTiff(
                    "tie point or pixel scale is too short".to_string(),
                ));
            }

            // Tiepoint format: [i, j, k, x, y, z] where (i,j) is pixel coords and (x,y) is world coords
            let (i, j) = (tiepoint[0], tiepoint[1]);
            let (x, y) = (tiepoint[3], tiepoint[4]);
            let (scale_x, scale_y) = (scale[0], scale[1]);

            Ok(GeoTransform([
                x - i * scale_x,
                scale_x,
                0.0,
                y + j * scale_y,
                0.0,
                -scale_y,
            ]))
        }
        _ => Err(GeoTiffError::InvalidGeoTiff(
            "no ModelTransformation or ModelTiepoint/ModelPixelScale tags".to_string(),
        )),
    }
}

/// Read the GeoKey directory and its parameter blocks.
///
/// A file without a GeoKey directory yields [`Crs::unspecified`].
pub fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Crs> {
    let geo_keys = match decoder.find_tag(GEO_KEY_DIRECTORY)? {
        Some(value) => value.into_u16_vec()?,
        None => return Ok(Crs::unspecified()),
    };
    let double_params = match decoder.find_tag(GEO_DOUBLE_PARAMS)? {
        Some(value) => value.into_f64_vec()?,
        None => Vec::new(),
    };
    let ascii_params = match decoder.find_tag(GEO_ASCII_PARAMS)? {
        Some(value) => value.into_string()?,
        None => String::new(),
    };

    Ok(Crs::from_geo_keys(geo_keys, double_params, ascii_params))
}

/// Read the GDAL nodata string, if present.
pub fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>> {
    let Some(value) = decoder.find_tag(GDAL_NODATA)? else {
        return Ok(None);
    };
    let text = value.into_string()?;
    let text = text.trim_matches(char::from(0)).trim();

    text.parse::<f64>()
        .map(Some)
        .map_err(|_| GeoTiffError::InvalidGeoTiff(format!("unparseable GDAL_NODATA value '{}'", text)))
}

/// Format a nodata value the way GDAL writes it.
pub fn format_nodata(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{}", value)
    }
}

/// Georeferencing tags to write for a transform.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoreferenceTags {
    /// Tie point at pixel (0,0) plus pixel scale.
    TiepointScale {
        /// ModelTiepointTag values.
        tiepoint: [f64; 6],
        /// ModelPixelScaleTag values.
        scale: [f64; 3],
    },
    /// Full affine matrix, used when the transform has rotation terms or a
    /// positive pixel height.
    Transformation([f64; 16]),
}

impl GeoreferenceTags {
    /// Choose the tag representation for a transform.
    pub fn for_transform(transform: &GeoTransform) -> Self {
        let [x0, px_w, rot_row, y0, rot_col, px_h] = transform.coefficients();

        if transform.is_rectilinear() && px_w > 0.0 && px_h < 0.0 {
            GeoreferenceTags::TiepointScale {
                tiepoint: [0.0, 0.0, 0.0, x0, y0, 0.0],
                scale: [px_w, -px_h, 0.0],
            }
        } else {
            GeoreferenceTags::Transformation([
                px_w, rot_row, 0.0, x0, //
                rot_col, px_h, 0.0, y0, //
                0.0, 0.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ])
        }
    }
}
