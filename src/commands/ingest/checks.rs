use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{error, info};

use super::scan::count_tree;
use crate::error::IngestError;
use crate::ledger::{Ledger, NAME_MAX_CHARS, name_fits};
use crate::model::SourceFile;

/// The reference tree must contain every sentinel directory; anything else
/// suggests the wrong mount.
pub fn check_reference_tree(reference_root: &Path, sentinel_dirs: &[String]) -> Result<()> {
    let missing = sentinel_dirs
        .iter()
        .filter(|name| !reference_root.join(name.as_str()).is_dir())
        .cloned()
        .collect::<Vec<String>>();

    if !missing.is_empty() {
        return Err(IngestError::ReferenceTreeUnexpected {
            root: reference_root.to_path_buf(),
            missing,
        }
        .into());
    }

    info!(reference = %reference_root.display(), "reference tree looks as expected");
    Ok(())
}

pub fn check_file_count(found: usize, range: &RangeInclusive<usize>, extension: &str) -> Result<()> {
    if found < *range.start() {
        return Err(IngestError::TooFewFiles {
            extension: extension.to_string(),
            found,
            min: *range.start(),
        }
        .into());
    }
    if found > *range.end() {
        return Err(IngestError::TooManyFiles {
            extension: extension.to_string(),
            found,
            max: *range.end(),
        }
        .into());
    }
    Ok(())
}

pub fn unmatched_companions(files: &[SourceFile]) -> Vec<PathBuf> {
    files
        .iter()
        .filter(|file| !file.companion_path.is_file())
        .map(|file| file.companion_path.clone())
        .collect()
}

/// Companions that more than one primary resolves to, with the claiming
/// relative paths. Archiving would move such a companion once and then fail.
pub fn shared_companions(files: &[SourceFile]) -> BTreeMap<&Path, Vec<&str>> {
    let mut claims = BTreeMap::<&Path, Vec<&str>>::new();
    for file in files {
        claims
            .entry(file.companion_path.as_path())
            .or_default()
            .push(file.relative_path.as_str());
    }
    claims.retain(|_, primaries| primaries.len() > 1);
    claims
}

pub fn check_pairs(files: &[SourceFile]) -> Result<()> {
    let missing = unmatched_companions(files);
    if !missing.is_empty() {
        for path in &missing {
            error!(companion = %path.display(), "missing companion file");
        }
        return Err(IngestError::UnpairedFiles { missing }.into());
    }

    let shared = shared_companions(files);
    if !shared.is_empty() {
        for (companion, primaries) in &shared {
            error!(
                companion = %companion.display(),
                primaries = ?primaries,
                "companion file claimed by several primary files"
            );
        }
        return Err(IngestError::SharedCompanions {
            shared: shared.keys().map(|path| path.to_path_buf()).collect(),
        }
        .into());
    }
    Ok(())
}

pub fn check_ledger_names(files: &[SourceFile]) -> Result<()> {
    let paths = files
        .iter()
        .filter(|file| !name_fits(&file.relative_path))
        .map(|file| file.relative_path.clone())
        .collect::<Vec<String>>();

    if !paths.is_empty() {
        for path in &paths {
            error!(path = %path, max_chars = NAME_MAX_CHARS, "relative path too long for ledger");
        }
        return Err(IngestError::PathsTooLong {
            max_chars: NAME_MAX_CHARS,
            paths,
        }
        .into());
    }
    Ok(())
}

pub fn already_processed(ledger: &Ledger, files: &[SourceFile]) -> Result<Vec<String>> {
    let mut processed = Vec::new();
    for file in files {
        if ledger.exists(&file.relative_path)? {
            processed.push(file.relative_path.clone());
        }
    }
    Ok(processed)
}

pub fn check_already_processed(ledger: &Ledger, files: &[SourceFile]) -> Result<()> {
    let paths = already_processed(ledger, files)?;
    if !paths.is_empty() {
        for path in &paths {
            error!(path = %path, "file already has an identifier");
        }
        return Err(IngestError::AlreadyProcessed { paths }.into());
    }
    Ok(())
}

/// A batch name that already exists under either root would mix two runs.
pub fn check_batch_available(batch_dirs: &[&Path]) -> Result<()> {
    for dir in batch_dirs {
        if dir.exists() {
            return Err(IngestError::BatchExists(dir.to_path_buf()).into());
        }
    }
    Ok(())
}

pub fn check_output_count(batch_dir: &Path, extension: &str, expected: usize) -> Result<()> {
    let found = count_tree(batch_dir, extension)?;
    if found != expected {
        return Err(IngestError::OutputCountMismatch {
            dir: batch_dir.to_path_buf(),
            extension: extension.to_string(),
            found,
            expected,
        }
        .into());
    }

    info!(dir = %batch_dir.display(), extension, count = found, "output count verified");
    Ok(())
}
