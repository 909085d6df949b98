use std::path::PathBuf;

use thiserror::Error;

/// Run-terminating failures raised by the ingest stages.
///
/// Each variant carries the offending items so the operator can act on the
/// report without re-running anything.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("target {root} does not look as expected; missing {missing:?}")]
    ReferenceTreeUnexpected { root: PathBuf, missing: Vec<String> },

    #[error("number of {extension} files in source tree is suspiciously low: {found} < {min}")]
    TooFewFiles {
        extension: String,
        found: usize,
        min: usize,
    },

    #[error("number of {extension} files in source tree is suspiciously high: {found} > {max}")]
    TooManyFiles {
        extension: String,
        found: usize,
        max: usize,
    },

    #[error("{} primary files have no companion where expected: {missing:?}", .missing.len())]
    UnpairedFiles { missing: Vec<PathBuf> },

    #[error("{} companion files are claimed by more than one primary file: {shared:?}", .shared.len())]
    SharedCompanions { shared: Vec<PathBuf> },

    #[error("{} relative paths exceed {max_chars} characters and cannot be recorded: {paths:?}", .paths.len())]
    PathsTooLong { max_chars: usize, paths: Vec<String> },

    #[error("{} files in this set have already been assigned an identifier: {paths:?}", .paths.len())]
    AlreadyProcessed { paths: Vec<String> },

    #[error("{path} gained a ledger entry after pre-flight checks passed")]
    LedgerInconsistent { path: String },

    #[error("batch directory {0} already exists")]
    BatchExists(PathBuf),

    #[error(
        "number [{found}] of generated {extension} files in {dir} does not match the source [{expected}]"
    )]
    OutputCountMismatch {
        dir: PathBuf,
        extension: String,
        found: usize,
        expected: usize,
    },

    #[error("refusing to remove {path}: {reason}")]
    UnsafeClean { path: PathBuf, reason: String },
}
