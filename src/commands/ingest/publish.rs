use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use tracing::{error, info};

use super::config::SyncTarget;
use super::scan::scan_tree;
use crate::model::{ChecksumManifest, SyncStatus};
use crate::util::sha256_file;

pub const MANIFEST_EXTENSION: &str = "sha256";

/// Writes `<batch_dir>/<batch_name>.sha256` in `sha256sum` format, one line
/// per `extension` file, sorted by path relative to the batch directory.
pub fn write_checksum_manifest(
    batch_dir: &Path,
    batch_name: &str,
    extension: &str,
) -> Result<ChecksumManifest> {
    let mut files = scan_tree(batch_dir, extension)?
        .into_iter()
        .map(|path| -> Result<(PathBuf, PathBuf)> {
            let relative = path
                .strip_prefix(batch_dir)
                .map(Path::to_path_buf)
                .with_context(|| format!("{} escaped {}", path.display(), batch_dir.display()))?;
            Ok((relative, path))
        })
        .collect::<Result<Vec<(PathBuf, PathBuf)>>>()?;
    files.sort();

    let manifest_path = batch_dir.join(format!("{batch_name}.{MANIFEST_EXTENSION}"));
    let file = File::create(&manifest_path)
        .with_context(|| format!("failed to create manifest {}", manifest_path.display()))?;
    let mut writer = BufWriter::new(file);

    for (relative, path) in &files {
        let digest = sha256_file(path)?;
        writeln!(writer, "{digest}  ./{}", relative.display())
            .with_context(|| format!("failed to write manifest {}", manifest_path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush manifest {}", manifest_path.display()))?;

    info!(
        path = %manifest_path.display(),
        files = files.len(),
        "wrote checksum manifest"
    );

    Ok(ChecksumManifest {
        root: batch_dir.display().to_string(),
        extension: extension.to_string(),
        manifest_path: manifest_path.display().to_string(),
        file_count: files.len(),
    })
}

/// One-way upload of a finished batch to remote storage.
pub trait RemoteSync {
    fn destination(&self, batch_name: &str) -> String;

    fn sync(&self, local_root: &Path, batch_name: &str) -> Result<()>;
}

/// `aws s3 sync <batch> s3://<bucket>/<batch>`, run from the destination root.
///
/// The transfer log goes straight to our stdout; stderr is kept for the error.
pub struct AwsCliSync {
    target: SyncTarget,
}

impl AwsCliSync {
    pub fn new(target: SyncTarget) -> Self {
        Self { target }
    }
}

impl RemoteSync for AwsCliSync {
    fn destination(&self, batch_name: &str) -> String {
        format!("s3://{}/{}", self.target.bucket, batch_name)
    }

    fn sync(&self, local_root: &Path, batch_name: &str) -> Result<()> {
        let output = Command::new(&self.target.program)
            .arg("s3")
            .arg("sync")
            .arg(batch_name)
            .arg(self.destination(batch_name))
            .current_dir(local_root)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .output()
            .with_context(|| format!("failed to execute {}", self.target.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} s3 sync returned non-zero exit status for {}: {}",
                self.target.program,
                batch_name,
                stderr.trim()
            );
        }

        Ok(())
    }
}

/// Runs the sync once. A failure is logged and reported, never retried and
/// never fatal: the batch is already complete locally.
pub fn publish(sync: Option<&dyn RemoteSync>, local_root: &Path, batch_name: &str) -> SyncStatus {
    let Some(sync) = sync else {
        info!(batch = %batch_name, "remote sync skipped");
        return SyncStatus::Skipped;
    };

    let destination = sync.destination(batch_name);
    info!(batch = %batch_name, destination = %destination, "starting remote sync");

    match sync.sync(local_root, batch_name) {
        Ok(()) => {
            info!(batch = %batch_name, destination = %destination, "remote sync completed");
            SyncStatus::Completed
        }
        Err(err) => {
            error!(
                batch = %batch_name,
                destination = %destination,
                error = %format!("{err:#}"),
                "remote sync failed; rerun the sync by hand"
            );
            SyncStatus::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync_with(program: &str) -> AwsCliSync {
        AwsCliSync::new(SyncTarget {
            program: program.to_string(),
            bucket: "bni-test".to_string(),
        })
    }

    #[test]
    fn aws_sync_succeeds_when_program_exits_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("000001")).expect("batch dir");

        sync_with("true")
            .sync(dir.path(), "000001")
            .expect("zero exit status is a successful sync");
    }

    #[test]
    fn aws_sync_fails_on_non_zero_exit_status() {
        let dir = tempfile::tempdir().expect("tempdir");

        let err = sync_with("false")
            .sync(dir.path(), "000001")
            .expect_err("non-zero exit status must fail");
        assert!(err.to_string().contains("non-zero exit status"), "{err:#}");
    }

    #[test]
    fn aws_sync_fails_when_program_is_missing() {
        let dir = tempfile::tempdir().expect("tempdir");

        let err = sync_with("bni-archiver-no-such-program")
            .sync(dir.path(), "000001")
            .expect_err("missing program must fail");
        assert!(err.to_string().contains("failed to execute"), "{err:#}");
    }

    #[test]
    fn destination_names_bucket_and_batch() {
        assert_eq!(sync_with("aws").destination("000042"), "s3://bni-test/000042");
    }
}
