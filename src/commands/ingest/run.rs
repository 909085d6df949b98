use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use super::archive::archive_all;
use super::batch::next_batch_name;
use super::checks::{
    check_already_processed, check_batch_available, check_file_count, check_ledger_names,
    check_output_count, check_pairs, check_reference_tree,
};
use super::config::IngestConfig;
use super::publish::{AwsCliSync, RemoteSync, publish, write_checksum_manifest};
use super::scan::scan_source;
use crate::cli::IngestArgs;
use crate::ledger::Ledger;
use crate::model::{ArchivedFile, IngestRunPaths, IngestRunReport, SyncStatus};
use crate::util::{now_utc_string, utc_compact_string, write_json_pretty};

#[derive(Debug)]
pub struct IngestOutcome {
    pub batch_name: String,
    pub archived: Vec<ArchivedFile>,
    pub report: IngestRunReport,
    pub report_path: PathBuf,
}

pub fn run(args: IngestArgs) -> Result<()> {
    let config = IngestConfig::from_args(&args)?;
    let sync = config.sync.clone().map(AwsCliSync::new);

    let outcome = execute(&config, sync.as_ref().map(|sync| sync as &dyn RemoteSync))?;

    info!(path = %outcome.report_path.display(), "wrote ingest run report");
    info!(
        batch = %outcome.batch_name,
        files = outcome.archived.len(),
        sync = ?outcome.report.sync_status,
        "ingest completed"
    );
    Ok(())
}

/// Runs the stages in order. Every check that can fail before the first
/// move runs before the first move.
pub fn execute(config: &IngestConfig, sync: Option<&dyn RemoteSync>) -> Result<IngestOutcome> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    info!(
        source = %config.source_path.display(),
        run_id = %run_id,
        dry_run = config.dry_run,
        "starting ingest"
    );

    check_reference_tree(&config.target_path, &config.sentinel_dirs)?;
    let batch_name = next_batch_name(&config.target_path, config.next_dir.as_deref());
    info!(batch = %batch_name, overridden = config.next_dir.is_some(), "selected batch");

    let files = scan_source(
        &config.source_path,
        &config.primary_ext,
        &config.companion_dir,
        &config.companion_ext,
    )?;
    info!(files = files.len(), extension = %config.primary_ext, "scanned source tree");

    check_file_count(files.len(), &config.file_count_range, &config.primary_ext)?;
    check_pairs(&files)?;
    check_ledger_names(&files)?;

    let mut ledger = Ledger::open(&config.ledger_path, &config.ledger)?;
    check_already_processed(&ledger, &files)?;

    let bni_batch_dir = config.bni_batch_dir(&batch_name);
    let lib_batch_dir = config.lib_batch_dir(&batch_name);
    check_batch_available(&[bni_batch_dir.as_path(), lib_batch_dir.as_path()])?;
    info!(files = files.len(), "pre-flight checks passed");

    let (archived, manifests, sync_status) = if config.dry_run {
        info!(batch = %batch_name, "dry run; stopping before any file is moved");
        (Vec::new(), Vec::new(), SyncStatus::Skipped)
    } else {
        let archived = archive_all(config, &mut ledger, &batch_name, &files)?;

        check_output_count(&bni_batch_dir, &config.primary_ext, files.len())?;
        check_output_count(&lib_batch_dir, &config.companion_ext, files.len())?;

        let manifests = vec![
            write_checksum_manifest(&bni_batch_dir, &batch_name, &config.primary_ext)?,
            write_checksum_manifest(&lib_batch_dir, &batch_name, &config.companion_ext)?,
        ];

        let sync_status = publish(sync, &config.bni_path, &batch_name);
        (archived, manifests, sync_status)
    };

    let report = IngestRunReport {
        report_version: 1,
        run_id,
        status: if config.dry_run { "dry_run" } else { "completed" }.to_string(),
        started_at,
        completed_at: now_utc_string(),
        batch_name: batch_name.clone(),
        dry_run: config.dry_run,
        paths: IngestRunPaths {
            source_path: config.source_path.display().to_string(),
            bni_path: config.bni_path.display().to_string(),
            lib_path: config.lib_path.display().to_string(),
            target_path: config.target_path.display().to_string(),
            ledger_path: config.ledger_path.display().to_string(),
        },
        source_file_count: files.len(),
        archived_file_count: archived.len(),
        first_identifier: archived.first().map(|file| file.identifier),
        last_identifier: archived.last().map(|file| file.identifier),
        manifests,
        sync_status,
        sync_destination: match sync_status {
            SyncStatus::Skipped => None,
            _ => sync.map(|sync| sync.destination(&batch_name)),
        },
    };

    let report_path = config.manifest_dir.join(format!(
        "ingest_run_{}_{}.json",
        batch_name,
        utc_compact_string(started_ts)
    ));
    write_json_pretty(&report_path, &report)?;

    Ok(IngestOutcome {
        batch_name,
        archived,
        report,
        report_path,
    })
}
