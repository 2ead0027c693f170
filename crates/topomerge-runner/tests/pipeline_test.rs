//! End-to-end runs of the align and combine steps over real GeoTIFF files.

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use topomerge_geotiff::{read_raster, write_raster, AnyRaster, WriteOptions};
use topomerge_raster::{Crs, GeoTransform, Grid, MaskedRaster, SampleType};
use topomerge_runner::{
    align_files, combine_files, run_pipeline, PipelineConfig, RunOptions, RunnerError,
};

// ============================================================================
// Fixtures
// ============================================================================

/// 4x4 grid of 10 m cells.
fn fine_grid() -> Grid {
    Grid::new(4, 4, GeoTransform::north_up(0.0, 40.0, 10.0, 10.0), Crs::from_epsg(32610)).unwrap()
}

/// 2x2 grid of 20 m cells over the same extent.
fn coarse_grid() -> Grid {
    Grid::new(2, 2, GeoTransform::north_up(0.0, 40.0, 20.0, 20.0), Crs::from_epsg(32610)).unwrap()
}

/// Writes the three pre-alignment inputs and returns their paths
/// (reference, dem, mask).
fn write_inputs(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let options = WriteOptions::default();

    let mut gebco = vec![100i16; 16];
    gebco[15] = -32768;
    let reference = dir.join("gebco_normalized.tif");
    write_raster(
        &reference,
        &MaskedRaster::from_sentinel(fine_grid(), gebco, Some(-32768)).unwrap(),
        &options,
    )
    .unwrap();

    let dem = dir.join("dem_land_normalized.tif");
    write_raster(
        &dem,
        &MaskedRaster::from_sentinel(coarse_grid(), vec![150.0f32, 50.0, 0.0, -9999.0], Some(-9999.0)).unwrap(),
        &options,
    )
    .unwrap();

    let mask = dir.join("lakes_initial.tif");
    write_raster(&mask, &MaskedRaster::filled(fine_grid(), 1u8, Some(0)), &options).unwrap();

    (reference, dem, mask)
}

/// Writes the inputs, aligns them into `aligned/` and returns the aligned
/// paths (dem, reference, mask).
fn aligned_inputs(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let (reference, dem, mask) = write_inputs(dir);
    let out_dir = dir.join("aligned");
    align_files(&reference, &out_dir, &[&reference, &dem, &mask], &RunOptions::default()).unwrap();
    (
        out_dir.join("dem_land_aligned.tif"),
        out_dir.join("gebco_aligned.tif"),
        out_dir.join("lakes_initial_aligned.tif"),
    )
}

const EXPECTED_DEM: [u16; 16] = [
    150, 150, 100, 100, //
    150, 150, 100, 100, //
    100, 100, 100, 100, //
    100, 100, 100, 65535,
];

const EXPECTED_MASK: [u8; 16] = [
    1, 1, 0, 0, //
    1, 1, 0, 0, //
    0, 0, 0, 0, //
    0, 0, 0, 0,
];

fn assert_outputs(out_dem: &Path, out_mask: &Path) {
    match read_raster(out_dem).unwrap() {
        AnyRaster::U16(merged) => {
            assert_eq!(merged.data(), &EXPECTED_DEM);
            assert_eq!(merged.nodata(), Some(65535));
            assert_eq!(merged.valid_count(), 15);
            assert_eq!(merged.grid(), &fine_grid());
        }
        other => panic!("merged DEM should be uint16, got {}", other.sample_type()),
    }

    match read_raster(out_mask).unwrap() {
        AnyRaster::U8(mask) => {
            assert_eq!(mask.data(), &EXPECTED_MASK);
            assert_eq!(mask.nodata(), Some(0));
        }
        other => panic!("trimmed mask should be uint8, got {}", other.sample_type()),
    }
}

// ============================================================================
// Library API
// ============================================================================

#[test]
fn test_align_keeps_type_and_nodata() {
    let dir = TempDir::new().unwrap();
    let (reference, dem, mask) = write_inputs(dir.path());
    let out_dir = dir.path().join("aligned");

    let written = align_files(&reference, &out_dir, &[dem, mask], &RunOptions::default()).unwrap();

    assert_eq!(written.len(), 2);
    assert_eq!(written[0].output, out_dir.join("dem_land_aligned.tif"));
    assert_eq!(written[0].sample_type, SampleType::F32);
    assert_eq!(written[0].valid_cells, 12);
    assert_eq!(written[1].output, out_dir.join("lakes_initial_aligned.tif"));

    match read_raster(&written[0].output).unwrap() {
        AnyRaster::F32(aligned) => {
            assert_eq!(aligned.grid(), &fine_grid());
            assert_eq!(aligned.nodata(), Some(-9999.0));
            assert_eq!(aligned.get(0, 0), Some(150.0));
            assert_eq!(aligned.get(3, 0), Some(50.0));
            assert_eq!(aligned.get(0, 3), Some(0.0));
            assert_eq!(aligned.get(3, 3), None);
        }
        other => panic!("expected float32, got {}", other.sample_type()),
    }
}

#[test]
fn test_align_then_combine() {
    let dir = TempDir::new().unwrap();
    let (reference, dem, mask) = write_inputs(dir.path());
    let out_dir = dir.path().join("aligned");
    let options = RunOptions::default();

    align_files(&reference, &out_dir, &[&reference, &dem, &mask], &options).unwrap();

    let out_dem = dir.path().join("cropped_dem.tif");
    let out_mask = dir.path().join("lakes_mask.tif");
    let stats = combine_files(
        &out_dir.join("dem_land_aligned.tif"),
        &out_dir.join("gebco_aligned.tif"),
        &out_dir.join("lakes_initial_aligned.tif"),
        &out_dem,
        &out_mask,
        &options,
    )
    .unwrap();

    assert_eq!(stats.cells, 16);
    assert_eq!(stats.from_dem, 4);
    assert_eq!(stats.from_reference, 11);
    assert_eq!(stats.merged_invalid, 1);
    assert_eq!(stats.mask_set, 4);
    assert_outputs(&out_dem, &out_mask);
}

#[test]
fn test_misaligned_combine_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let (reference, dem, mask) = write_inputs(dir.path());
    let out_dem = dir.path().join("cropped_dem.tif");
    let out_mask = dir.path().join("lakes_mask.tif");

    // The DEM is still on its coarse grid.
    let err = combine_files(&dem, &reference, &mask, &out_dem, &out_mask, &RunOptions::default())
        .unwrap_err();

    assert!(matches!(err, RunnerError::Raster(_)), "{err}");
    assert!(!out_dem.exists());
    assert!(!out_mask.exists());
}

#[test]
fn test_unwritable_mask_leaves_no_merged_dem() {
    let dir = TempDir::new().unwrap();
    let (dem, reference, mask) = aligned_inputs(dir.path());
    let out_dem = dir.path().join("cropped_dem.tif");
    let out_mask = dir.path().join("missing").join("lakes_mask.tif");

    let err = combine_files(&dem, &reference, &mask, &out_dem, &out_mask, &RunOptions::default())
        .unwrap_err();

    assert!(matches!(err, RunnerError::Io(_)), "{err}");
    assert!(!out_dem.exists());
    assert!(!out_mask.exists());
    // No temporary files are left next to the intended output either.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name())
        .collect();
    assert_eq!(leftovers.len(), 3, "{leftovers:?}");
}

#[test]
fn test_combine_rejects_output_over_input_before_reading() {
    let dir = TempDir::new().unwrap();
    let (dem, reference, mask) = aligned_inputs(dir.path());
    let out_mask = dir.path().join("lakes_mask.tif");

    let err = combine_files(&dem, &reference, &mask, &reference, &out_mask, &RunOptions::default())
        .unwrap_err();

    assert!(matches!(err, RunnerError::WouldOverwriteInput(_)), "{err}");
    assert_eq!(read_raster(&reference).unwrap().sample_type(), SampleType::I16);
    assert!(!out_mask.exists());
}

#[test]
fn test_align_rejects_duplicate_names_before_writing() {
    let dir = TempDir::new().unwrap();
    let (reference, dem, _) = write_inputs(dir.path());
    for sub in ["one", "two"] {
        std::fs::create_dir(dir.path().join(sub)).unwrap();
        std::fs::copy(&dem, dir.path().join(sub).join("dem_land_normalized.tif")).unwrap();
    }
    let out_dir = dir.path().join("aligned");

    let err = align_files(
        &reference,
        &out_dir,
        &[
            dir.path().join("one/dem_land_normalized.tif"),
            dir.path().join("two/dem_land_normalized.tif"),
        ],
        &RunOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, RunnerError::DuplicateOutput(_)), "{err}");
    assert!(!out_dir.exists());
}

#[test]
fn test_run_pipeline_from_yaml() {
    let dir = TempDir::new().unwrap();
    write_inputs(dir.path());

    let config_path = dir.path().join("pipeline.yaml");
    std::fs::write(
        &config_path,
        r#"
reference: gebco_normalized.tif
output_dir: aligned
align:
  - gebco_normalized.tif
  - dem_land_normalized.tif
  - lakes_initial.tif
combine:
  dem: aligned/dem_land_aligned.tif
  reference: aligned/gebco_aligned.tif
  mask: aligned/lakes_initial_aligned.tif
  out_dem: cropped_dem.tif
  out_mask: lakes_mask.tif
compression: deflate
parallel:
  enabled: true
  min_parallel_pixels: 0
"#,
    )
    .unwrap();

    let config = PipelineConfig::from_file(&config_path).unwrap();
    let report = run_pipeline(&config, &RunOptions::from_config(&config)).unwrap();

    assert_eq!(report.aligned.len(), 3);
    assert!(report.combine.is_some());
    assert_outputs(&dir.path().join("cropped_dem.tif"), &dir.path().join("lakes_mask.tif"));
}

// ============================================================================
// Binary
// ============================================================================

#[test]
fn test_cli_combine_failure_exits_with_status_one() {
    let dir = TempDir::new().unwrap();
    let (reference, dem, mask) = write_inputs(dir.path());
    let out_dem = dir.path().join("out_dem.tif");
    let out_mask = dir.path().join("out_mask.tif");

    let status = Command::new(env!("CARGO_BIN_EXE_topomerge"))
        .arg("combine")
        .args([&dem, &reference, &mask, &out_dem, &out_mask])
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
    assert!(!out_dem.exists());
}

#[test]
fn test_cli_align() {
    let dir = TempDir::new().unwrap();
    let (reference, dem, _) = write_inputs(dir.path());
    let out_dir = dir.path().join("out");

    let status = Command::new(env!("CARGO_BIN_EXE_topomerge"))
        .args(["--log-level", "warn", "--compression", "none", "--no-parallel", "align"])
        .arg("--reference")
        .arg(&reference)
        .arg("--out-dir")
        .arg(&out_dir)
        .arg(&dem)
        .status()
        .unwrap();

    assert!(status.success());
    let aligned = read_raster(out_dir.join("dem_land_aligned.tif")).unwrap();
    assert_eq!(aligned.grid(), &fine_grid());
    assert_eq!(aligned.sample_type(), SampleType::F32);
}

#[test]
fn test_cli_combine_refuses_to_overwrite_dem_input() {
    let dir = TempDir::new().unwrap();
    let (dem, reference, mask) = aligned_inputs(dir.path());
    let out_mask = dir.path().join("lakes_mask.tif");

    let status = Command::new(env!("CARGO_BIN_EXE_topomerge"))
        .arg("combine")
        .args([&dem, &reference, &mask, &dem, &out_mask])
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
    // The DEM input is still the aligned float32 raster, not a uint16 result.
    assert_eq!(read_raster(&dem).unwrap().sample_type(), SampleType::F32);
    assert!(!out_mask.exists());
}

#[test]
fn test_cli_combine_rejects_one_path_for_both_outputs() {
    let dir = TempDir::new().unwrap();
    let (dem, reference, mask) = aligned_inputs(dir.path());
    let out = dir.path().join("out.tif");

    let status = Command::new(env!("CARGO_BIN_EXE_topomerge"))
        .arg("combine")
        .args([&dem, &reference, &mask, &out, &out])
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
    assert!(!out.exists());
}

#[test]
fn test_cli_align_rejects_colliding_names() {
    let dir = TempDir::new().unwrap();
    let (reference, dem, _) = write_inputs(dir.path());
    let one = dir.path().join("one");
    let two = dir.path().join("two");
    for sub in [&one, &two] {
        std::fs::create_dir(sub).unwrap();
        std::fs::copy(&dem, sub.join("dem_land_normalized.tif")).unwrap();
    }
    let out_dir = dir.path().join("out");

    let status = Command::new(env!("CARGO_BIN_EXE_topomerge"))
        .arg("align")
        .arg("--reference")
        .arg(&reference)
        .arg("--out-dir")
        .arg(&out_dir)
        .arg(one.join("dem_land_normalized.tif"))
        .arg(two.join("dem_land_normalized.tif"))
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
    assert!(!out_dir.join("dem_land_aligned.tif").exists());
}
