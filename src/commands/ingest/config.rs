use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::cli::IngestArgs;
use crate::ledger::LedgerOptions;
use crate::util::is_writable_dir;

/// Everything one ingest run needs, resolved and checked before any stage
/// touches the filesystem.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub source_path: PathBuf,
    pub bni_path: PathBuf,
    pub lib_path: PathBuf,
    pub target_path: PathBuf,
    pub next_dir: Option<String>,
    pub ledger_path: PathBuf,
    pub ledger: LedgerOptions,
    pub file_count_range: RangeInclusive<usize>,
    pub primary_ext: String,
    pub companion_ext: String,
    pub companion_dir: String,
    pub sentinel_dirs: Vec<String>,
    pub sync: Option<SyncTarget>,
    pub dry_run: bool,
    pub manifest_dir: PathBuf,
    pub show_progress: bool,
}

#[derive(Debug, Clone)]
pub struct SyncTarget {
    pub program: String,
    pub bucket: String,
}

impl IngestConfig {
    pub fn from_args(args: &IngestArgs) -> Result<Self> {
        check_readable(&args.source_path, "source", "--source")?;
        check_writable(&args.bni_path, "BNI", "--bni")?;
        check_writable(&args.lib_path, "LIB", "--lib")?;
        check_readable(&args.target_path, "target", "--target")?;

        if args.min_files > args.max_files {
            bail!(
                "--min-files ({}) must not exceed --max-files ({})",
                args.min_files,
                args.max_files
            );
        }
        if let Some(next_dir) = &args.next_dir {
            check_batch_override(next_dir)?;
        }
        for (flag, value) in [
            ("--primary-ext", &args.primary_ext),
            ("--companion-ext", &args.companion_ext),
            ("--companion-dir", &args.companion_dir),
        ] {
            if value.is_empty() || value.contains('/') {
                bail!("{flag} must be a non-empty name without path separators");
            }
        }

        let sync = (!args.skip_sync).then(|| SyncTarget {
            program: args.sync_program.clone(),
            bucket: args.bucket.clone(),
        });

        Ok(Self {
            source_path: args.source_path.clone(),
            bni_path: args.bni_path.clone(),
            lib_path: args.lib_path.clone(),
            target_path: args.target_path.clone(),
            next_dir: args.next_dir.clone(),
            ledger_path: args.ledger_path.clone(),
            ledger: LedgerOptions::default(),
            file_count_range: args.min_files..=args.max_files,
            primary_ext: args.primary_ext.clone(),
            companion_ext: args.companion_ext.clone(),
            companion_dir: args.companion_dir.clone(),
            sentinel_dirs: args.sentinel_dirs.clone(),
            sync,
            dry_run: args.dry_run,
            manifest_dir: args.manifest_dir.clone(),
            show_progress: !args.no_progress,
        })
    }

    pub fn bni_batch_dir(&self, batch_name: &str) -> PathBuf {
        self.bni_path.join(batch_name)
    }

    pub fn lib_batch_dir(&self, batch_name: &str) -> PathBuf {
        self.lib_path.join(batch_name)
    }
}

fn check_readable(path: &Path, label: &str, flag: &str) -> Result<()> {
    if !path.exists() {
        bail!("cannot read {label} path {} (pass a valid {flag})", path.display());
    }
    Ok(())
}

fn check_writable(path: &Path, label: &str, flag: &str) -> Result<()> {
    if !is_writable_dir(path) {
        bail!(
            "cannot write to {label} path {} (pass a writable directory to {flag})",
            path.display()
        );
    }
    Ok(())
}

fn check_batch_override(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        bail!("--next must be a single directory name, got {name:?}");
    }
    Ok(())
}
