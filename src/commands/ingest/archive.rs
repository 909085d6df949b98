use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use super::batch::collapsed_subdir;
use super::config::IngestConfig;
use crate::error::IngestError;
use crate::ledger::Ledger;
use crate::model::{ArchivedFile, SourceFile};
use crate::util::ensure_directory;

/// Moves every source pair into the batch, allocating identifiers as it goes.
///
/// Each identifier is committed before its files move. A failure part-way
/// leaves that identifier spent and earlier files already archived; nothing
/// is rolled back.
pub fn archive_all(
    config: &IngestConfig,
    ledger: &mut Ledger,
    batch_name: &str,
    files: &[SourceFile],
) -> Result<Vec<ArchivedFile>> {
    let bni_batch_dir = config.bni_batch_dir(batch_name);
    let lib_batch_dir = config.lib_batch_dir(batch_name);
    create_batch_dirs(&bni_batch_dir, &lib_batch_dir)?;

    let progress = progress_bar(files.len() as u64, config.show_progress)?;
    let mut archived = Vec::with_capacity(files.len());

    for file in files {
        if ledger.exists(&file.relative_path)? {
            return Err(IngestError::LedgerInconsistent {
                path: file.relative_path.clone(),
            }
            .into());
        }
        let identifier = ledger.allocate(&file.relative_path)?;

        let subdir = collapsed_subdir(Path::new(&file.relative_path))?;
        let primary_destination =
            archive_file(&file.primary_path, &bni_batch_dir.join(&subdir), identifier)?;
        let companion_destination =
            archive_file(&file.companion_path, &lib_batch_dir.join(&subdir), identifier)?;

        debug!(
            identifier,
            relative_path = %file.relative_path,
            primary = %primary_destination.display(),
            companion = %companion_destination.display(),
            "archived pair"
        );

        archived.push(ArchivedFile {
            identifier,
            relative_path: file.relative_path.clone(),
            primary_destination: primary_destination.display().to_string(),
            companion_destination: companion_destination.display().to_string(),
        });
        progress.inc(1);
    }

    progress.finish_and_clear();
    info!(batch = %batch_name, files = archived.len(), "archived source files");

    Ok(archived)
}

pub fn archived_file_name(identifier: i64, source: &Path) -> Result<String> {
    let basename = source
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("invalid UTF-8 filename: {}", source.display()))?;
    Ok(format!("{identifier}__{basename}"))
}

fn archive_file(source: &Path, destination_dir: &Path, identifier: i64) -> Result<PathBuf> {
    ensure_directory(destination_dir)?;
    let destination = destination_dir.join(archived_file_name(identifier, source)?);
    move_file(source, &destination)?;
    Ok(destination)
}

/// Creates both batch directories, or neither: if the second cannot be
/// created, the first (still empty) is removed again.
pub fn create_batch_dirs(bni_batch_dir: &Path, lib_batch_dir: &Path) -> Result<()> {
    create_batch_dir(bni_batch_dir)?;
    if let Err(err) = create_batch_dir(lib_batch_dir) {
        if let Err(cleanup) = fs::remove_dir(bni_batch_dir) {
            warn!(
                path = %bni_batch_dir.display(),
                error = %cleanup,
                "failed to remove batch directory after aborted batch"
            );
        }
        return Err(err);
    }
    Ok(())
}

fn create_batch_dir(path: &Path) -> Result<()> {
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            Err(IngestError::BatchExists(path.to_path_buf()).into())
        }
        Err(err) => Err(err)
            .with_context(|| format!("failed to create batch directory {}", path.display())),
    }
}

/// Renames `source` to `destination`, copying across devices when a rename
/// is impossible. An existing destination is never overwritten.
pub fn move_file(source: &Path, destination: &Path) -> Result<()> {
    if destination.exists() {
        bail!(
            "refusing to overwrite {} with {}",
            destination.display(),
            source.display()
        );
    }

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
            copy_then_remove(source, destination)
        }
        Err(err) => Err(err).with_context(|| {
            format!(
                "failed to move {} to {}",
                source.display(),
                destination.display()
            )
        }),
    }
}

fn copy_then_remove(source: &Path, destination: &Path) -> Result<()> {
    fs::copy(source, destination).with_context(|| {
        format!(
            "failed to copy {} to {}",
            source.display(),
            destination.display()
        )
    })?;
    File::open(destination)
        .and_then(|file| file.sync_all())
        .with_context(|| format!("failed to sync {}", destination.display()))?;
    fs::remove_file(source)
        .with_context(|| format!("failed to remove {} after copy", source.display()))?;
    Ok(())
}

fn progress_bar(total: u64, visible: bool) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }

    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} ({percent}%) {eta}")
            .context("invalid progress bar template")?,
    );
    Ok(bar)
}
