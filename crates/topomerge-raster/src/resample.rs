//! Nearest-neighbour alignment of a raster onto another grid.

use crate::parallel::map_cells;
use crate::{Grid, MaskedRaster, ParallelConfig, Result, Sample};
use tracing::{debug, warn};

/// Resample `source` onto `destination` using nearest-neighbour sampling.
///
/// Uses the default [`ParallelConfig`].
pub fn align<T: Sample>(source: &MaskedRaster<T>, destination: &Grid) -> Result<MaskedRaster<T>> {
    align_with(source, destination, &ParallelConfig::default())
}

/// Resample `source` onto `destination` using nearest-neighbour sampling.
///
/// Each destination pixel centre is mapped into the source's pixel space and
/// takes the value and validity of the source cell containing it. Pixels that
/// fall outside the source are invalid and hold the source's fill value. The
/// output keeps the source's element type and nodata sentinel.
///
/// Both frames are related through their affine transforms only. Differing
/// CRS identifiers are reported but not reconciled.
pub fn align_with<T: Sample>(
    source: &MaskedRaster<T>,
    destination: &Grid,
    config: &ParallelConfig,
) -> Result<MaskedRaster<T>> {
    let src_grid = source.grid();
    if src_grid.crs() != destination.crs() {
        warn!(
            "Aligning {} raster onto {} grid; only the affine transforms are used",
            src_grid.crs(),
            destination.crs()
        );
    }
    debug!(
        "Aligning {}x{} raster onto {}x{} grid",
        src_grid.width(),
        src_grid.height(),
        destination.width(),
        destination.height()
    );

    let src_width = src_grid.width();
    let src_height = src_grid.height();
    let src_data = source.data();
    let src_valid = source.valid();
    let fill = source.fill_value();
    let dst_width = destination.width();

    let cells = map_cells(destination.len(), dst_width, config, |i| {
        let col = i % dst_width;
        let row = i / dst_width;
        let (x, y) = destination.pixel_to_world(col as f64 + 0.5, row as f64 + 0.5);
        match source_index(src_grid, x, y, src_width, src_height) {
            Some(idx) => (src_data[idx], src_valid[idx]),
            None => (fill, false),
        }
    });
    let (data, valid): (Vec<T>, Vec<bool>) = cells.into_iter().unzip();

    Ok(MaskedRaster::from_parts(
        destination.clone(),
        data,
        valid,
        source.nodata(),
    ))
}

/// Buffer index of the source cell containing world point `(x, y)`.
///
/// A pixel covers `[col, col+1)`, so flooring the fractional coordinate picks
/// the cell whose centre is nearest.
fn source_index(grid: &Grid, x: f64, y: f64, width: usize, height: usize) -> Option<usize> {
    let (col, row) = grid.world_to_pixel(x, y);
    let (col, row) = (col.floor(), row.floor());
    let inside = col >= 0.0 && row >= 0.0 && col < width as f64 && row < height as f64;
    inside.then(|| grid.index(col as usize, row as usize))
}
