use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::model::SourceFile;
use crate::util::{has_extension, normalize_lexically};

/// Every file under `root` whose extension is exactly `extension`.
///
/// Directory entries are visited in file-name order so that two scans of an
/// unchanged tree agree.
pub fn scan_tree(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if entry.file_type().is_file() && has_extension(entry.path(), extension) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

pub fn count_tree(root: &Path, extension: &str) -> Result<usize> {
    Ok(scan_tree(root, extension)?.len())
}

/// `.../<Dir>/<stem>.<primary>` → `.../<Dir>/../<companion_dir>/<stem>.<companion_ext>`,
/// with the `..` resolved lexically.
pub fn resolve_companion(primary_path: &Path, companion_dir: &str, companion_ext: &str) -> PathBuf {
    let stem = primary_path.file_stem().unwrap_or_default();
    let parent = primary_path.parent().unwrap_or_else(|| Path::new(""));

    let mut file_name = stem.to_os_string();
    file_name.push(".");
    file_name.push(companion_ext);

    normalize_lexically(&parent.join("..").join(companion_dir).join(file_name))
}

/// Ledger key for `path`: the part after `source_root`, with a leading `/`
/// and `/` separators.
pub fn relative_ledger_path(source_root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(source_root).with_context(|| {
        format!(
            "{} is not below source root {}",
            path.display(),
            source_root.display()
        )
    })?;

    let mut key = String::new();
    for component in relative.components() {
        let part = component
            .as_os_str()
            .to_str()
            .with_context(|| format!("invalid UTF-8 path: {}", path.display()))?;
        key.push('/');
        key.push_str(part);
    }

    Ok(key)
}

pub fn scan_source(
    source_root: &Path,
    primary_ext: &str,
    companion_dir: &str,
    companion_ext: &str,
) -> Result<Vec<SourceFile>> {
    scan_tree(source_root, primary_ext)?
        .into_iter()
        .map(|primary_path| -> Result<SourceFile> {
            let relative_path = relative_ledger_path(source_root, &primary_path)?;
            let companion_path = resolve_companion(&primary_path, companion_dir, companion_ext);
            Ok(SourceFile {
                primary_path,
                companion_path,
                relative_path,
            })
        })
        .collect()
}
