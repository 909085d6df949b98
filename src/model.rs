use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub identifier: i64,
    pub relative_path: String,
    pub created_at: DateTime<Utc>,
}

/// One primary file discovered by the scanner together with its companion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub primary_path: PathBuf,
    pub companion_path: PathBuf,
    /// Path below the source root with a leading `/`, as recorded in the ledger.
    pub relative_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchivedFile {
    pub identifier: i64,
    pub relative_path: String,
    pub primary_destination: String,
    pub companion_destination: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChecksumManifest {
    pub root: String,
    pub extension: String,
    pub manifest_path: String,
    pub file_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunPaths {
    pub source_path: String,
    pub bni_path: String,
    pub lib_path: String,
    pub target_path: String,
    pub ledger_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunReport {
    pub report_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: String,
    pub batch_name: String,
    pub dry_run: bool,
    pub paths: IngestRunPaths,
    pub source_file_count: usize,
    pub archived_file_count: usize,
    pub first_identifier: Option<i64>,
    pub last_identifier: Option<i64>,
    pub manifests: Vec<ChecksumManifest>,
    pub sync_status: SyncStatus,
    pub sync_destination: Option<String>,
}
