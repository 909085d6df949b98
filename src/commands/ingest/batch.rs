use std::path::{Component, Path, PathBuf};

use anyhow::{Result, bail};

pub const BATCH_NAME_WIDTH: usize = 6;

pub fn format_batch_name(sequence: u64) -> String {
    format!("{sequence:0width$}", width = BATCH_NAME_WIDTH)
}

/// The batch name for this run: `override_name` verbatim when given,
/// otherwise the first of `000001`, `000002`, ... absent from `reference_root`.
pub fn next_batch_name(reference_root: &Path, override_name: Option<&str>) -> String {
    if let Some(name) = override_name {
        return name.to_string();
    }

    let mut sequence = 1_u64;
    while reference_root.join(format_batch_name(sequence)).exists() {
        sequence += 1;
    }
    format_batch_name(sequence)
}

/// Destination subdirectory for a file below the source root: its parent
/// directory with the last segment dropped.
///
/// `Reel1/Tifs/1.tif` lands in `Reel1`, `Tifs/1.tif` and `1.tif` at the
/// batch root.
pub fn collapsed_subdir(relative_path: &Path) -> Result<PathBuf> {
    let mut segments = Vec::new();
    for component in relative_path.parent().unwrap_or(Path::new("")).components() {
        match component {
            Component::Normal(segment) => segments.push(segment),
            Component::RootDir | Component::CurDir => {}
            other => bail!(
                "unexpected component {:?} in relative path {}",
                other.as_os_str(),
                relative_path.display()
            ),
        }
    }
    segments.pop();

    Ok(segments.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use super::{collapsed_subdir, format_batch_name, next_batch_name};

    #[test]
    fn empty_reference_root_yields_first_batch() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(next_batch_name(dir.path(), None), "000001");
    }

    #[test]
    fn probing_skips_existing_batches() {
        let dir = tempfile::tempdir().expect("tempdir");
        for sequence in 1..=5 {
            fs::create_dir(dir.path().join(format_batch_name(sequence))).expect("mkdir");
        }
        assert_eq!(next_batch_name(dir.path(), None), "000006");
    }

    #[test]
    fn probing_stops_at_the_first_gap() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["000001", "000002", "000004"] {
            fs::create_dir(dir.path().join(name)).expect("mkdir");
        }
        assert_eq!(next_batch_name(dir.path(), None), "000003");
    }

    #[test]
    fn override_is_used_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("000001")).expect("mkdir");
        assert_eq!(next_batch_name(dir.path(), Some("00049")), "00049");
    }

    #[test]
    fn collapsed_subdir_drops_the_immediate_parent() {
        assert_eq!(
            collapsed_subdir(Path::new("/Reel1/Tifs/1.tif")).expect("collapse"),
            PathBuf::from("Reel1")
        );
        assert_eq!(
            collapsed_subdir(Path::new("/Paper/1921/Reel1/Tifs/1.tif")).expect("collapse"),
            PathBuf::from("Paper/1921/Reel1")
        );
        assert_eq!(
            collapsed_subdir(Path::new("/Tifs/1.tif")).expect("collapse"),
            PathBuf::new()
        );
        assert_eq!(
            collapsed_subdir(Path::new("/1.tif")).expect("collapse"),
            PathBuf::new()
        );
    }

    #[test]
    fn collapsed_subdir_rejects_parent_segments() {
        assert!(collapsed_subdir(Path::new("/Reel1/../Tifs/1.tif")).is_err());
    }
}
