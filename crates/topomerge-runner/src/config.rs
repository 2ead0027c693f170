//! Pipeline configuration loaded from YAML.
//!
//! ```yaml
//! reference: gebco_normalized.tif
//! output_dir: aligned
//! align:
//!   - dem_land_normalized.tif
//!   - gebco_normalized.tif
//!   - lakes_initial.tif
//! combine:
//!   dem: aligned/dem_land_aligned.tif
//!   reference: aligned/gebco_aligned.tif
//!   mask: aligned/lakes_initial_aligned.tif
//!   out_dem: cropped_dem.tif
//!   out_mask: lakes_mask.tif
//! compression: lzw
//! parallel:
//!   enabled: true
//!   min_parallel_pixels: 65536
//! ```
//!
//! Relative paths are resolved against the directory holding the YAML file.

use crate::output::{check_align_outputs, check_combine_outputs};
use crate::{Result, RunnerError};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use topomerge_geotiff::{Compression, WriteOptions};
use topomerge_raster::{ParallelConfig, DEFAULT_MIN_PARALLEL_PIXELS};

/// Compression choice as spelled on the command line and in YAML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CompressionSetting {
    /// No compression.
    None,
    /// LZW compression.
    #[default]
    Lzw,
    /// Deflate compression.
    Deflate,
}

impl From<CompressionSetting> for Compression {
    fn from(setting: CompressionSetting) -> Self {
        match setting {
            CompressionSetting::None => Compression::None,
            CompressionSetting::Lzw => Compression::Lzw,
            CompressionSetting::Deflate => Compression::Deflate,
        }
    }
}

/// Parallel evaluation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelSettings {
    /// Whether per-pixel work may be spread across threads.
    pub enabled: bool,
    /// Rasters smaller than this many cells are processed on one thread.
    pub min_parallel_pixels: usize,
}

impl Default for ParallelSettings {
    fn default() -> Self {
        ParallelSettings {
            enabled: true,
            min_parallel_pixels: DEFAULT_MIN_PARALLEL_PIXELS,
        }
    }
}

impl From<ParallelSettings> for ParallelConfig {
    fn from(settings: ParallelSettings) -> Self {
        ParallelConfig {
            enabled: settings.enabled,
            min_parallel_pixels: settings.min_parallel_pixels,
        }
    }
}

/// Inputs and outputs of the combine step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombineConfig {
    /// Aligned elevation model.
    pub dem: PathBuf,
    /// Aligned reference surface.
    pub reference: PathBuf,
    /// Aligned mask.
    pub mask: PathBuf,
    /// Merged elevation output (uint16).
    pub out_dem: PathBuf,
    /// Trimmed mask output (uint8).
    pub out_mask: PathBuf,
}

/// A full align-then-combine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Raster whose grid every input is aligned onto.
    pub reference: PathBuf,
    /// Directory receiving the aligned rasters.
    pub output_dir: PathBuf,
    /// Rasters to align.
    #[serde(default)]
    pub align: Vec<PathBuf>,
    /// Optional combine step, run after alignment.
    #[serde(default)]
    pub combine: Option<CombineConfig>,
    /// Compression of every written file.
    #[serde(default)]
    pub compression: CompressionSetting,
    /// Parallel evaluation settings.
    #[serde(default)]
    pub parallel: ParallelSettings,
}

impl PipelineConfig {
    /// Load configuration from a YAML file, resolving relative paths against
    /// the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Parse configuration from a YAML string. Paths are kept as written.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Prefix every relative path with `base`.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };

        resolve(&mut self.reference);
        resolve(&mut self.output_dir);
        for path in &mut self.align {
            resolve(path);
        }
        if let Some(combine) = self.combine.as_mut() {
            resolve(&mut combine.dem);
            resolve(&mut combine.reference);
            resolve(&mut combine.mask);
            resolve(&mut combine.out_dem);
            resolve(&mut combine.out_mask);
        }
    }

    /// Validate configuration.
    ///
    /// Applies the same output checks as [`align_files`](crate::align_files)
    /// and [`combine_files`](crate::combine_files), so a bad pipeline fails
    /// before any step runs.
    pub fn validate(&self) -> Result<()> {
        if self.align.is_empty() && self.combine.is_none() {
            return Err(RunnerError::InvalidConfig(
                "pipeline needs at least one file to align or a combine section".to_string(),
            ));
        }

        check_align_outputs(&self.reference, &self.output_dir, self.align.as_slice())?;

        if let Some(combine) = &self.combine {
            check_combine_outputs(
                [combine.dem.as_path(), combine.reference.as_path(), combine.mask.as_path()],
                &combine.out_dem,
                &combine.out_mask,
            )?;
        }

        Ok(())
    }

    /// Encoder options for every written file.
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions::with_compression(self.compression.into())
    }

    /// Parallel configuration for alignment and combination.
    pub fn parallel_config(&self) -> ParallelConfig {
        self.parallel.into()
    }
}
