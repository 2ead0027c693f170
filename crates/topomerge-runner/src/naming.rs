//! Output file names for aligned rasters.

use std::path::Path;

const NORMALIZED: &str = "_normalized";
const INITIAL: &str = "_initial";
const ALIGNED: &str = "_aligned";

/// File name for the aligned copy of `source`.
///
/// `_normalized` becomes `_aligned` and `_initial` becomes `_initial_aligned`,
/// applied in that order to every occurrence. A name containing neither gets
/// `_aligned` inserted before its extension, so an aligned file never has the
/// same name as its source.
///
/// ```
/// use topomerge_runner::aligned_file_name;
///
/// assert_eq!(aligned_file_name("data/dem_land_normalized.tif"), "dem_land_aligned.tif");
/// assert_eq!(aligned_file_name("lakes_initial.tif"), "lakes_initial_aligned.tif");
/// assert_eq!(aligned_file_name("gebco.tif"), "gebco_aligned.tif");
/// ```
pub fn aligned_file_name<P: AsRef<Path>>(source: P) -> String {
    let source = source.as_ref();
    let base = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let renamed = base
        .replace(NORMALIZED, ALIGNED)
        .replace(INITIAL, &format!("{}{}", INITIAL, ALIGNED));
    if renamed != base {
        return renamed;
    }

    match base.rfind('.') {
        Some(dot) if dot > 0 => format!("{}{}{}", &base[..dot], ALIGNED, &base[dot..]),
        _ => format!("{}{}", base, ALIGNED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_suffix() {
        assert_eq!(aligned_file_name("dem_land_normalized.tif"), "dem_land_aligned.tif");
        assert_eq!(aligned_file_name("/tmp/x/gebco_normalized.tiff"), "gebco_aligned.tiff");
    }

    #[test]
    fn test_initial_suffix() {
        assert_eq!(aligned_file_name("lakes_mask_initial.tif"), "lakes_mask_initial_aligned.tif");
    }

    #[test]
    fn test_fallback_inserts_before_extension() {
        assert_eq!(aligned_file_name("reference.tif"), "reference_aligned.tif");
        assert_eq!(aligned_file_name("archive.v2.tif"), "archive.v2_aligned.tif");
        assert_eq!(aligned_file_name("noext"), "noext_aligned");
        assert_eq!(aligned_file_name(".hidden"), ".hidden_aligned");
    }

    #[test]
    fn test_never_returns_source_name() {
        for name in ["a.tif", "b_normalized.tif", "c_initial.tif", "d_aligned.tif"] {
            assert_ne!(aligned_file_name(name), name);
        }
    }
}
