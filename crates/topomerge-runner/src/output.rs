//! Output path checks and staged writes.
//!
//! Every step checks its output paths before reading any input, and encodes
//! each output into a temporary file next to its destination. The temporary
//! files are renamed into place only once every output of the step has been
//! encoded.

use crate::{aligned_file_name, Result, RunnerError};
use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use topomerge_geotiff::{dispatch, write_to, AnyRaster, WriteOptions};

/// Resolve `path` as far as the filesystem allows, so that `a.tif`,
/// `./a.tif` and a symlink to it compare equal.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    match (parent_dir(path).canonicalize(), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Output paths of an align step, one per input file and in input order.
///
/// Fails if two inputs share an aligned name, or if an output would replace
/// an input or the reference.
pub(crate) fn check_align_outputs<P: AsRef<Path>>(
    reference: &Path,
    out_dir: &Path,
    files: &[P],
) -> Result<Vec<PathBuf>> {
    let mut inputs: HashSet<PathBuf> = files.iter().map(|f| normalize(f.as_ref())).collect();
    inputs.insert(normalize(reference));

    let mut seen = HashSet::with_capacity(files.len());
    let mut outputs = Vec::with_capacity(files.len());
    for source in files {
        let output = out_dir.join(aligned_file_name(source.as_ref()));
        let normalized = normalize(&output);
        if inputs.contains(&normalized) {
            return Err(RunnerError::WouldOverwriteInput(output));
        }
        if !seen.insert(normalized) {
            return Err(RunnerError::DuplicateOutput(output));
        }
        outputs.push(output);
    }
    Ok(outputs)
}

/// Fails if the two combine outputs are one file, or if either would replace
/// an input.
pub(crate) fn check_combine_outputs(inputs: [&Path; 3], out_dem: &Path, out_mask: &Path) -> Result<()> {
    let dem_target = normalize(out_dem);
    let mask_target = normalize(out_mask);
    if dem_target == mask_target {
        return Err(RunnerError::DuplicateOutput(out_mask.to_path_buf()));
    }

    let inputs: Vec<PathBuf> = inputs.iter().map(|p| normalize(p)).collect();
    for (output, target) in [(out_dem, &dem_target), (out_mask, &mask_target)] {
        if inputs.contains(target) {
            return Err(RunnerError::WouldOverwriteInput(output.to_path_buf()));
        }
    }
    Ok(())
}

/// An encoded raster waiting in a temporary file beside its destination.
///
/// Dropping it deletes the temporary file.
pub(crate) struct StagedFile {
    temp: NamedTempFile,
    target: PathBuf,
}

/// Encode `raster` into a temporary file in the directory of `target`.
pub(crate) fn stage(target: &Path, raster: &AnyRaster, options: &WriteOptions) -> Result<StagedFile> {
    let temp = NamedTempFile::new_in(parent_dir(target))?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        dispatch!(raster, inner => write_to(&mut writer, inner, options))?;
        writer.flush()?;
    }

    // Temporary files are created owner-only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file().set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    tracing::debug!(
        "Encoded {} {} for {}",
        raster.sample_type(),
        temp.path().display(),
        target.display()
    );
    Ok(StagedFile {
        temp,
        target: target.to_path_buf(),
    })
}

/// Move staged files onto their destinations.
///
/// If a move fails, destinations already written by this call are removed
/// and the remaining temporary files are discarded.
pub(crate) fn commit(staged: Vec<StagedFile>) -> Result<()> {
    let mut committed: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for StagedFile { temp, target } in staged {
        if let Err(e) = temp.persist(&target) {
            for path in &committed {
                if let Err(remove) = std::fs::remove_file(path) {
                    tracing::warn!("Could not remove {}: {}", path.display(), remove);
                }
            }
            return Err(e.error.into());
        }
        tracing::info!("Wrote {}", target.display());
        committed.push(target);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use topomerge_raster::{Crs, GeoTransform, Grid, MaskedRaster};

    fn raster() -> AnyRaster {
        let grid = Grid::new(2, 2, GeoTransform::north_up(0.0, 2.0, 1.0, 1.0), Crs::from_epsg(4326)).unwrap();
        AnyRaster::from(MaskedRaster::filled(grid, 7u16, Some(0)))
    }

    #[test]
    fn test_dot_prefix_is_same_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("dem.tif");
        std::fs::write(&input, b"").unwrap();
        let dotted = dir.path().join(".").join("dem.tif");

        let err = check_combine_outputs(
            [dotted.as_path(), Path::new("r.tif"), Path::new("m.tif")],
            &input,
            Path::new("o.tif"),
        )
        .unwrap_err();
        assert!(matches!(err, RunnerError::WouldOverwriteInput(_)), "{err}");
    }

    #[test]
    fn test_combine_outputs_must_differ() {
        let err = check_combine_outputs(
            [Path::new("d.tif"), Path::new("r.tif"), Path::new("m.tif")],
            Path::new("out.tif"),
            Path::new("out.tif"),
        )
        .unwrap_err();
        assert!(matches!(err, RunnerError::DuplicateOutput(_)), "{err}");
    }

    #[test]
    fn test_align_outputs() {
        let outputs = check_align_outputs(
            Path::new("ref.tif"),
            Path::new("out"),
            &["a/dem_normalized.tif", "b/lakes.tif"],
        )
        .unwrap();
        assert_eq!(
            outputs,
            vec![PathBuf::from("out/dem_aligned.tif"), PathBuf::from("out/lakes_aligned.tif")]
        );

        let err = check_align_outputs(
            Path::new("ref.tif"),
            Path::new("out"),
            &["one/dem_normalized.tif", "two/dem_normalized.tif"],
        )
        .unwrap_err();
        assert!(matches!(err, RunnerError::DuplicateOutput(_)), "{err}");

        // Aligning `dem` into the directory that holds `dem_aligned.tif` as
        // another input would replace that input.
        let err = check_align_outputs(
            Path::new("ref.tif"),
            Path::new("in"),
            &["in/dem.tif", "in/dem_aligned.tif"],
        )
        .unwrap_err();
        assert!(matches!(err, RunnerError::WouldOverwriteInput(_)), "{err}");
    }

    #[test]
    fn test_failed_commit_removes_earlier_outputs() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.tif");
        // A directory cannot be replaced by a file, so the second move fails.
        let second = dir.path().join("second.tif");
        std::fs::create_dir(&second).unwrap();

        let staged = vec![
            stage(&first, &raster(), &WriteOptions::default()).unwrap(),
            stage(&second, &raster(), &WriteOptions::default()).unwrap(),
        ];
        assert!(commit(staged).is_err());

        assert!(!first.exists());
        // Only the directory created above is left.
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_nothing_visible_until_commit() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.tif");

        let staged = stage(&target, &raster(), &WriteOptions::default()).unwrap();
        assert!(!target.exists());
        commit(vec![staged]).unwrap();

        let written = topomerge_geotiff::read_raster(&target).unwrap();
        assert_eq!(written.valid_count(), 4);
    }
}
