//! Merging of an elevation model with a reference surface under a mask.
//!
//! For every cell the elevation model (DEM) wins when it is at least as high
//! as the reference, or when the reference has no data. At the same time the
//! input mask is trimmed to the cells where the DEM value is trustworthy.
//!
//! Comparisons are always guarded by both validity flags: a nodata cell never
//! takes part in `d >= g`, whatever sentinel it carries.

use crate::parallel::map_cells;
use crate::{Grid, MaskedRaster, ParallelConfig, RasterError, RasterView, Result, Sample};
use tracing::warn;

/// Nodata sentinel of the merged elevation raster.
pub const MERGED_NODATA: u16 = u16::MAX;

/// Nodata sentinel of the trimmed mask. Zero also means "not set".
pub const MASK_NODATA: u8 = 0;

/// Result of [`combine`].
#[derive(Debug, Clone, PartialEq)]
pub struct CombineOutput {
    /// DEM or reference value per cell, as `u16` with nodata [`MERGED_NODATA`].
    pub merged: MaskedRaster<u16>,
    /// 1 where the mask survives trimming, 0 elsewhere. Every cell is valid.
    pub trimmed_mask: MaskedRaster<u8>,
    /// Cell counts for reporting.
    pub stats: CombineStats,
}

/// Cell counts describing a combine run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombineStats {
    /// Total cells.
    pub cells: usize,
    /// Valid merged cells whose value came from the DEM.
    pub from_dem: usize,
    /// Valid merged cells whose value came from the reference.
    pub from_reference: usize,
    /// Cells set in the trimmed mask.
    pub mask_set: usize,
    /// Merged cells with no data.
    pub merged_invalid: usize,
    /// Valid merged cells whose `u16` value equals [`MERGED_NODATA`]. They
    /// read back as nodata once written.
    pub saturated: usize,
}

/// Per-cell decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Decision {
    /// Take the DEM value (otherwise the reference).
    height_ok: bool,
    /// Keep the mask cell set.
    mask_ok: bool,
}

/// Apply the merge rule to one cell.
///
/// `mask_set` is true only for a valid, nonzero mask cell.
fn decide(d: f64, dv: bool, g: f64, gv: bool, mask_set: bool) -> Decision {
    let dem_at_least_reference = dv && gv && d >= g;

    let height_ok = dem_at_least_reference || !gv;

    // The third clause is implied by the second; it is kept so that a zero
    // DEM over missing reference is accepted by an explicit rule.
    let mask_ok = (dem_at_least_reference || (dv && !gv) || (dv && d == 0.0 && !gv)) && mask_set;

    Decision { height_ok, mask_ok }
}

/// Merge `dem` with `reference` under `mask` using the default [`ParallelConfig`].
pub fn combine<D, R, M>(
    dem: &MaskedRaster<D>,
    reference: &MaskedRaster<R>,
    mask: &MaskedRaster<M>,
) -> Result<CombineOutput>
where
    D: Sample,
    R: Sample,
    M: Sample,
{
    combine_with(dem, reference, mask, &ParallelConfig::default())
}

/// Merge `dem` with `reference` under `mask`.
///
/// All three rasters must share an identical grid; otherwise the call fails
/// with [`RasterError::MisalignedInputs`] and produces nothing. Values are
/// compared as `f64`, so the inputs may have different element types.
///
/// Per cell, with `d`/`dv` the DEM value and validity, `g`/`gv` the reference,
/// and the mask counting as set only when valid and nonzero:
///
/// * merged value: `d` if `(dv && gv && d >= g) || !gv`, else `g`, carrying
///   the chosen source's validity;
/// * trimmed mask: 1 if the mask is set and
///   `(dv && gv && d >= g) || (dv && !gv) || (dv && d == 0 && !gv)`, else 0.
///
/// Merged values are narrowed to `u16` with saturation.
pub fn combine_with<D, R, M>(
    dem: &MaskedRaster<D>,
    reference: &MaskedRaster<R>,
    mask: &MaskedRaster<M>,
    config: &ParallelConfig,
) -> Result<CombineOutput>
where
    D: Sample,
    R: Sample,
    M: Sample,
{
    combine_views(dem, reference, mask, config)
}

/// [`combine_with`] over type-erased rasters.
///
/// Lets callers whose element types are only known at run time combine
/// without one instantiation per type triple.
pub fn combine_views(
    dem: &dyn RasterView,
    reference: &dyn RasterView,
    mask: &dyn RasterView,
    config: &ParallelConfig,
) -> Result<CombineOutput> {
    check_aligned(dem.grid(), "dem", reference.grid(), "reference")?;
    check_aligned(dem.grid(), "dem", mask.grid(), "mask")?;

    let grid = dem.grid();
    let len = grid.len();
    for raster in [dem, reference, mask] {
        let (data, valid) = raster.buffer_lens();
        if (data, valid) != (len, len) {
            return Err(RasterError::ShapeMismatch {
                expected: len,
                data,
                valid,
            });
        }
    }

    let cells = map_cells(len, grid.width(), config, |i| {
        let (d, dv) = (dem.value(i), dem.is_valid(i));
        let (g, gv) = (reference.value(i), reference.is_valid(i));
        let mask_set = mask.is_valid(i) && mask.value(i) != 0.0;

        let decision = decide(d, dv, g, gv, mask_set);
        let (value, valid) = if decision.height_ok { (d, dv) } else { (g, gv) };
        (u16::from_f64(value), valid, decision)
    });

    let mut stats = CombineStats {
        cells: len,
        ..Default::default()
    };
    let mut merged_data = Vec::with_capacity(len);
    let mut merged_valid = Vec::with_capacity(len);
    let mut mask_data = Vec::with_capacity(len);
    for (value, valid, decision) in cells {
        merged_data.push(value);
        merged_valid.push(valid);
        mask_data.push(decision.mask_ok as u8);

        match (valid, decision.height_ok) {
            (false, _) => stats.merged_invalid += 1,
            (true, true) => stats.from_dem += 1,
            (true, false) => stats.from_reference += 1,
        }
        if valid && value == MERGED_NODATA {
            stats.saturated += 1;
        }
        if decision.mask_ok {
            stats.mask_set += 1;
        }
    }

    if stats.saturated > 0 {
        warn!(
            "{} valid merged cells reach {} and will read back as nodata",
            stats.saturated, MERGED_NODATA
        );
    }

    Ok(CombineOutput {
        merged: MaskedRaster::from_parts(grid.clone(), merged_data, merged_valid, Some(MERGED_NODATA)),
        trimmed_mask: MaskedRaster::from_parts(grid.clone(), mask_data, vec![true; len], Some(MASK_NODATA)),
        stats,
    })
}

fn check_aligned(left: &Grid, left_name: &'static str, right: &Grid, right_name: &'static str) -> Result<()> {
    match left.mismatch(right) {
        Some(mismatch) => Err(RasterError::MisalignedInputs {
            left: left_name,
            right: right_name,
            mismatch,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_truth_table() {
        // DEM higher than reference, mask set.
        assert_eq!(
            decide(10.0, true, 5.0, true, true),
            Decision { height_ok: true, mask_ok: true }
        );
        // Equal heights count as "at least".
        assert_eq!(
            decide(5.0, true, 5.0, true, true),
            Decision { height_ok: true, mask_ok: true }
        );
        // DEM lower than reference.
        assert_eq!(
            decide(3.0, true, 5.0, true, true),
            Decision { height_ok: false, mask_ok: false }
        );
        // Reference missing: DEM wins, mask kept.
        assert_eq!(
            decide(0.0, true, 65535.0, false, true),
            Decision { height_ok: true, mask_ok: true }
        );
        // Both missing: DEM (invalid) chosen, mask dropped.
        assert_eq!(
            decide(0.0, false, 0.0, false, true),
            Decision { height_ok: true, mask_ok: false }
        );
        // DEM missing, reference valid.
        assert_eq!(
            decide(1e9, false, 2.0, true, true),
            Decision { height_ok: false, mask_ok: false }
        );
        // Mask not set never keeps the mask bit.
        assert_eq!(
            decide(10.0, true, 5.0, true, false),
            Decision { height_ok: true, mask_ok: false }
        );
    }

    #[test]
    fn test_nodata_sentinel_not_compared() {
        // An invalid reference carrying a low sentinel must not make a lower
        // DEM "win" through comparison; it wins because the reference is missing.
        let with_sentinel = decide(-5.0, true, -9999.0, false, true);
        assert!(with_sentinel.height_ok);
        // An invalid DEM carrying a huge sentinel must not beat a valid reference.
        let huge = decide(f64::MAX, false, 1.0, true, true);
        assert!(!huge.height_ok);
        assert!(!huge.mask_ok);
    }
}
