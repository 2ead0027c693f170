//! `topomerge` command line.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use topomerge_runner::{
    align_files, combine_files, run_pipeline, CompressionSetting, PipelineConfig, RunOptions,
};
use tracing_subscriber::{fmt, EnvFilter};

/// Align elevation rasters to a common grid and merge them.
#[derive(Parser, Debug)]
#[command(name = "topomerge")]
#[command(about = "Align GeoTIFF rasters and combine a DEM with a reference surface", long_about = None)]
struct Cli {
    /// Log level, used when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Compression of written files (overrides the pipeline file)
    #[arg(long, value_enum, global = true)]
    compression: Option<CompressionSetting>,

    /// Process every raster on a single thread
    #[arg(long, global = true)]
    no_parallel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resample rasters onto the grid of a reference raster
    Align {
        /// Raster defining the target grid
        #[arg(short, long)]
        reference: PathBuf,

        /// Directory for the aligned files
        #[arg(short, long)]
        out_dir: PathBuf,

        /// Rasters to align
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Merge an aligned DEM with a reference surface under a mask
    Combine {
        /// Aligned elevation model
        dem: PathBuf,
        /// Aligned reference surface
        reference: PathBuf,
        /// Aligned mask
        mask: PathBuf,
        /// Output merged DEM (uint16)
        out_dem: PathBuf,
        /// Output trimmed mask (uint8)
        out_mask: PathBuf,
    },

    /// Run an align-then-combine pipeline from a YAML file
    Run {
        /// Path to pipeline YAML file
        #[arg(short, long)]
        config: PathBuf,
    },
}

impl Cli {
    fn options(&self, base: RunOptions) -> RunOptions {
        let mut options = base;
        if let Some(compression) = self.compression {
            options.write.compression = compression.into();
        }
        if self.no_parallel {
            options.parallel.enabled = false;
        }
        options
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt().with_env_filter(filter).with_target(false).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> topomerge_runner::Result<()> {
    match &cli.command {
        Commands::Align {
            reference,
            out_dir,
            files,
        } => {
            let options = cli.options(RunOptions::default());
            align_files(reference, out_dir, files, &options)?;
        }
        Commands::Combine {
            dem,
            reference,
            mask,
            out_dem,
            out_mask,
        } => {
            let options = cli.options(RunOptions::default());
            combine_files(dem, reference, mask, out_dem, out_mask, &options)?;
        }
        Commands::Run { config } => {
            tracing::info!("Loading pipeline {}", config.display());
            let config = PipelineConfig::from_file(config)?;
            let options = cli.options(RunOptions::from_config(&config));
            let report = run_pipeline(&config, &options)?;
            tracing::info!(
                "Pipeline finished: {} files aligned, combine {}",
                report.aligned.len(),
                if report.combine.is_some() { "done" } else { "skipped" }
            );
        }
    }
    Ok(())
}
