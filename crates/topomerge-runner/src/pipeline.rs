//! Align and combine steps over GeoTIFF files.

use crate::output::{check_align_outputs, check_combine_outputs, commit, stage};
use crate::{PipelineConfig, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use topomerge_geotiff::{dispatch, read_raster, AnyRaster, WriteOptions};
use topomerge_raster::{align_with, combine_views, CombineStats, ParallelConfig, SampleType};

/// Settings shared by every step of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Encoder options for written files.
    pub write: WriteOptions,
    /// Parallel evaluation settings.
    pub parallel: ParallelConfig,
}

impl RunOptions {
    /// Options taken from a pipeline file.
    pub fn from_config(config: &PipelineConfig) -> Self {
        RunOptions {
            write: config.write_options(),
            parallel: config.parallel_config(),
        }
    }
}

/// One file written by [`align_files`].
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFile {
    /// Input path.
    pub source: PathBuf,
    /// Written path.
    pub output: PathBuf,
    /// Element type, kept from the source.
    pub sample_type: SampleType,
    /// Valid cells after alignment.
    pub valid_cells: usize,
}

/// What a pipeline run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Aligned files, in input order.
    pub aligned: Vec<AlignedFile>,
    /// Statistics of the combine step, if it ran.
    pub combine: Option<CombineStats>,
}

/// Align every file onto the grid of `reference` and write the results into
/// `out_dir`.
///
/// Each output keeps its source's element type and nodata value and is named
/// by [`aligned_file_name`](crate::aligned_file_name). Output names are
/// checked before anything is read: two inputs with the same aligned name, or
/// an output that would replace an input or the reference, fail the call. A
/// file is written only once its alignment has succeeded.
pub fn align_files<P: AsRef<Path>>(
    reference: &Path,
    out_dir: &Path,
    files: &[P],
    options: &RunOptions,
) -> Result<Vec<AlignedFile>> {
    let outputs = check_align_outputs(reference, out_dir, files)?;

    let reference = read_raster(reference)?;
    let grid = reference.grid().clone();
    tracing::info!(
        "Reference grid {}x{} ({})",
        grid.width(),
        grid.height(),
        grid.crs()
    );

    std::fs::create_dir_all(out_dir)?;

    let mut written = Vec::with_capacity(files.len());
    for (source_path, output) in files.iter().zip(outputs) {
        let source_path = source_path.as_ref();
        tracing::info!("Aligning {} -> {}", source_path.display(), output.display());

        let start = Instant::now();
        let source = read_raster(source_path)?;
        let aligned: AnyRaster = dispatch!(&source, raster => {
            AnyRaster::from(align_with(raster, &grid, &options.parallel)?)
        });
        tracing::debug!("Aligned {} in {:?}", source_path.display(), start.elapsed());

        commit(vec![stage(&output, &aligned, &options.write)?])?;
        written.push(AlignedFile {
            source: source_path.to_path_buf(),
            output,
            sample_type: aligned.sample_type(),
            valid_cells: aligned.valid_count(),
        });
    }

    tracing::info!("Alignment complete ({} files)", written.len());
    Ok(written)
}

/// Combine three aligned rasters and write the merged DEM and trimmed mask.
///
/// Inputs may have any supported element type. The outputs must be two
/// distinct files, neither of them an input; this is checked before anything
/// is read. Both outputs are encoded before either is moved into place, so
/// on error neither exists.
pub fn combine_files(
    dem: &Path,
    reference: &Path,
    mask: &Path,
    out_dem: &Path,
    out_mask: &Path,
    options: &RunOptions,
) -> Result<CombineStats> {
    check_combine_outputs([dem, reference, mask], out_dem, out_mask)?;

    let dem = read_raster(dem)?;
    let reference = read_raster(reference)?;
    let mask = read_raster(mask)?;

    let start = Instant::now();
    let output = combine_views(dem.as_view(), reference.as_view(), mask.as_view(), &options.parallel)?;
    let stats = output.stats;
    tracing::debug!("Combined {} cells in {:?}", stats.cells, start.elapsed());

    let staged = vec![
        stage(out_dem, &AnyRaster::from(output.merged), &options.write)?,
        stage(out_mask, &AnyRaster::from(output.trimmed_mask), &options.write)?,
    ];
    commit(staged)?;

    tracing::info!(
        "Combined: {} cells from DEM, {} from reference, {} without data, {} mask cells kept",
        stats.from_dem,
        stats.from_reference,
        stats.merged_invalid,
        stats.mask_set
    );
    if stats.saturated > 0 {
        tracing::warn!(
            "{} cells of {} hold 65535 and read back as nodata",
            stats.saturated,
            out_dem.display()
        );
    }
    Ok(stats)
}

/// Run a validated pipeline: align every listed file, then combine.
pub fn run_pipeline(config: &PipelineConfig, options: &RunOptions) -> Result<PipelineReport> {
    config.validate()?;

    let aligned = if config.align.is_empty() {
        Vec::new()
    } else {
        align_files(&config.reference, &config.output_dir, &config.align, options)?
    };

    let combine = match &config.combine {
        Some(step) => Some(combine_files(
            &step.dem,
            &step.reference,
            &step.mask,
            &step.out_dem,
            &step.out_mask,
            options,
        )?),
        None => None,
    };

    Ok(PipelineReport { aligned, combine })
}
