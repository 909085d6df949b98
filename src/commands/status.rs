use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::ingest::next_batch_name;
use crate::ledger::{DEFAULT_SENTINEL_NAME, Ledger};

pub fn run(args: StatusArgs) -> Result<()> {
    info!(ledger = %args.ledger_path.display(), "status requested");

    if args.ledger_path.exists() {
        let ledger = Ledger::open_existing(&args.ledger_path)?;
        let sentinel = Some(DEFAULT_SENTINEL_NAME);
        let entries = ledger.entry_count(sentinel)?;
        let first = ledger.first_entry(sentinel)?;
        let last = ledger.last_entry(sentinel)?;

        info!(
            path = %args.ledger_path.display(),
            entries,
            first_identifier = first.as_ref().map(|entry| entry.identifier).unwrap_or_default(),
            last_identifier = last.as_ref().map(|entry| entry.identifier).unwrap_or_default(),
            last_path = %last.as_ref().map(|entry| entry.relative_path.as_str()).unwrap_or_default(),
            last_recorded_at = %last.as_ref().map(|entry| entry.created_at.to_rfc3339()).unwrap_or_default(),
            "ledger status"
        );
    } else {
        warn!(path = %args.ledger_path.display(), "ledger file missing");
    }

    if let Some(target_path) = &args.target_path {
        if target_path.is_dir() {
            info!(
                reference = %target_path.display(),
                next_batch = %next_batch_name(target_path, None),
                "next batch name"
            );
        } else {
            warn!(path = %target_path.display(), "target tree missing");
        }
    }

    Ok(())
}
