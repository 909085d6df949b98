use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::CleanSourceArgs;
use crate::commands::ingest::count_tree;
use crate::error::IngestError;

pub fn run(args: CleanSourceArgs) -> Result<()> {
    remove_emptied_source(&args.source_path, &args.primary_ext)
}

/// Deletes `source_root` once an ingest has moved every primary file out of it.
pub fn remove_emptied_source(source_root: &Path, primary_ext: &str) -> Result<()> {
    if source_root.as_os_str().is_empty() || source_root.parent().is_none() {
        return Err(IngestError::UnsafeClean {
            path: source_root.to_path_buf(),
            reason: "path is empty or a filesystem root".to_string(),
        }
        .into());
    }

    let remaining = count_tree(source_root, primary_ext)?;
    if remaining > 0 {
        warn!(
            path = %source_root.display(),
            remaining,
            "cowardly refusing to remove non-empty source dir"
        );
        return Err(IngestError::UnsafeClean {
            path: source_root.to_path_buf(),
            reason: format!("{remaining} {primary_ext} files remain"),
        }
        .into());
    }

    info!(path = %source_root.display(), "removing source dir");
    fs::remove_dir_all(source_root)
        .with_context(|| format!("failed to remove {}", source_root.display()))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::remove_emptied_source;

    #[test]
    fn removes_tree_once_primaries_are_gone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("incoming");
        fs::create_dir_all(source.join("Reel1/Jpgs")).expect("mkdir");
        fs::write(source.join("Reel1/notes.txt"), b"leftover").expect("write");

        remove_emptied_source(&source, "tif").expect("clean");
        assert!(!source.exists());
    }

    #[test]
    fn refuses_tree_with_remaining_primaries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("incoming");
        fs::create_dir_all(source.join("Reel1/Tifs")).expect("mkdir");
        fs::write(source.join("Reel1/Tifs/1.tif"), b"tif").expect("write");

        assert!(remove_emptied_source(&source, "tif").is_err());
        assert!(source.join("Reel1/Tifs/1.tif").exists());
    }

    #[test]
    fn refuses_root_and_empty_paths() {
        assert!(remove_emptied_source(Path::new("/"), "tif").is_err());
        assert!(remove_emptied_source(Path::new(""), "tif").is_err());
    }
}
