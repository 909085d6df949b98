//! Persisted relative-path → identifier assignments.
//!
//! The ledger is an append-only SQLite table. Identifiers come from an
//! `AUTOINCREMENT` rowid, so a value handed out once is never handed out
//! again, even if rows are later removed by hand. Every allocation commits
//! on its own; there is no batching of ledger writes.

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::model::LedgerEntry;

const TABLE: &str = "bni_image";
/// `name VARCHAR(512)`, counted in characters.
pub const NAME_MAX_CHARS: usize = 512;

pub const DEFAULT_FIRST_IDENTIFIER: i64 = 512_083;
pub const DEFAULT_SENTINEL_NAME: &str = "START";

#[derive(Debug, Clone)]
pub struct LedgerOptions {
    /// First identifier a real file receives in a freshly created ledger.
    pub first_identifier: i64,
    /// Seed row inserted at `first_identifier - 1` on creation.
    pub sentinel_name: Option<String>,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            first_identifier: DEFAULT_FIRST_IDENTIFIER,
            sentinel_name: Some(DEFAULT_SENTINEL_NAME.to_string()),
        }
    }
}

pub struct Ledger {
    connection: Connection,
}

impl Ledger {
    pub fn open(path: &Path, options: &LedgerOptions) -> Result<Self> {
        let connection = Connection::open(path)
            .with_context(|| format!("failed to open ledger {}", path.display()))?;
        configure_connection(&connection)?;

        let mut ledger = Self { connection };
        if ledger.ensure_schema(options)? {
            info!(
                path = %path.display(),
                first_identifier = options.first_identifier,
                "created ledger"
            );
        }

        Ok(ledger)
    }

    /// Opens an existing ledger without creating or seeding it.
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.is_file() {
            bail!("ledger {} does not exist", path.display());
        }
        let connection = Connection::open(path)
            .with_context(|| format!("failed to open ledger {}", path.display()))?;
        Ok(Self { connection })
    }

    pub fn exists(&self, relative_path: &str) -> Result<bool> {
        let found: bool = self
            .connection
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM bni_image WHERE name = ?1)",
                params![relative_path],
                |row| row.get(0),
            )
            .with_context(|| format!("failed to look up {relative_path} in ledger"))?;
        Ok(found)
    }

    /// Records `relative_path` and returns its new identifier.
    ///
    /// No deduplication happens here: callers guarantee a path is allocated
    /// at most once, and a repeated call simply yields a larger identifier.
    pub fn allocate(&mut self, relative_path: &str) -> Result<i64> {
        if !name_fits(relative_path) {
            bail!(
                "relative path exceeds {NAME_MAX_CHARS} characters and cannot be recorded: {relative_path}"
            );
        }

        self.connection
            .execute(
                "INSERT INTO bni_image(name, timestamp) VALUES(?1, ?2)",
                params![relative_path, Utc::now()],
            )
            .with_context(|| format!("failed to allocate identifier for {relative_path}"))?;

        Ok(self.connection.last_insert_rowid())
    }

    pub fn entry_count(&self, sentinel: Option<&str>) -> Result<i64> {
        let count = match sentinel {
            Some(sentinel) => self.connection.query_row(
                "SELECT COUNT(*) FROM bni_image WHERE name <> ?1",
                params![sentinel],
                |row| row.get(0),
            )?,
            None => self
                .connection
                .query_row("SELECT COUNT(*) FROM bni_image", [], |row| row.get(0))?,
        };
        Ok(count)
    }

    pub fn first_entry(&self, sentinel: Option<&str>) -> Result<Option<LedgerEntry>> {
        self.boundary_entry("ASC", sentinel)
    }

    pub fn last_entry(&self, sentinel: Option<&str>) -> Result<Option<LedgerEntry>> {
        self.boundary_entry("DESC", sentinel)
    }

    fn boundary_entry(&self, order: &str, sentinel: Option<&str>) -> Result<Option<LedgerEntry>> {
        let sql = format!(
            "SELECT uuid, name, timestamp FROM {TABLE} WHERE name <> ?1 ORDER BY uuid {order} LIMIT 1"
        );
        let entry = self
            .connection
            .query_row(&sql, params![sentinel.unwrap_or("")], read_entry)
            .optional()?;
        Ok(entry)
    }

    /// Returns true when the table was created by this call.
    fn ensure_schema(&mut self, options: &LedgerOptions) -> Result<bool> {
        let tx = self
            .connection
            .transaction()
            .context("failed to begin ledger schema transaction")?;

        let present: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![TABLE],
            |row| row.get(0),
        )?;
        if present {
            return Ok(false);
        }

        tx.execute_batch(
            "
            CREATE TABLE bni_image (
              uuid INTEGER PRIMARY KEY AUTOINCREMENT,
              name VARCHAR(512) NOT NULL,
              timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_bni_image_name ON bni_image(name);
            ",
        )
        .context("failed to create ledger schema")?;

        let seed_identifier = options.first_identifier - 1;
        match &options.sentinel_name {
            Some(sentinel) => {
                tx.execute(
                    "INSERT INTO bni_image(uuid, name) VALUES(?1, ?2)",
                    params![seed_identifier, sentinel],
                )
                .context("failed to seed ledger sentinel row")?;
            }
            None => {
                tx.execute(
                    "INSERT INTO sqlite_sequence(name, seq) VALUES(?1, ?2)",
                    params![TABLE, seed_identifier],
                )
                .context("failed to set ledger sequence offset")?;
            }
        }

        tx.commit().context("failed to commit ledger schema")?;
        Ok(true)
    }
}

pub fn name_fits(relative_path: &str) -> bool {
    relative_path.chars().count() <= NAME_MAX_CHARS
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "FULL")
        .context("failed to set synchronous=FULL")?;
    Ok(())
}

fn read_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerEntry> {
    Ok(LedgerEntry {
        identifier: row.get(0)?,
        relative_path: row.get(1)?,
        created_at: row.get::<_, DateTime<Utc>>(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        DEFAULT_FIRST_IDENTIFIER, DEFAULT_SENTINEL_NAME, Ledger, LedgerOptions, NAME_MAX_CHARS,
        name_fits,
    };

    fn open_temp(options: &LedgerOptions) -> (tempfile::TempDir, Ledger) {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = Ledger::open(&dir.path().join("ledger.db"), options).expect("open ledger");
        (dir, ledger)
    }

    #[test]
    fn fresh_ledger_starts_one_past_the_sentinel() {
        let (_dir, mut ledger) = open_temp(&LedgerOptions::default());

        let sentinel = ledger
            .first_entry(None)
            .expect("query sentinel")
            .expect("sentinel row present");
        assert_eq!(sentinel.identifier, DEFAULT_FIRST_IDENTIFIER - 1);
        assert_eq!(sentinel.relative_path, DEFAULT_SENTINEL_NAME);

        let id = ledger.allocate("/Reel1/Tifs/1.tif").expect("allocate");
        assert_eq!(id, DEFAULT_FIRST_IDENTIFIER);
    }

    #[test]
    fn offset_is_honored_without_a_sentinel_row() {
        let options = LedgerOptions {
            first_identifier: 1000,
            sentinel_name: None,
        };
        let (_dir, mut ledger) = open_temp(&options);

        assert_eq!(ledger.entry_count(None).expect("count"), 0);
        assert_eq!(ledger.allocate("/a.tif").expect("allocate"), 1000);
        assert_eq!(ledger.allocate("/b.tif").expect("allocate"), 1001);
    }

    #[test]
    fn allocate_records_path_and_ids_strictly_increase() {
        let (_dir, mut ledger) = open_temp(&LedgerOptions::default());

        assert!(!ledger.exists("/Reel1/Tifs/1.tif").expect("exists"));
        let first = ledger.allocate("/Reel1/Tifs/1.tif").expect("allocate");
        assert!(ledger.exists("/Reel1/Tifs/1.tif").expect("exists"));

        let second = ledger.allocate("/Reel1/Tifs/2.tif").expect("allocate");
        assert_eq!(second, first + 1);

        let repeated = ledger.allocate("/Reel1/Tifs/1.tif").expect("allocate");
        assert!(repeated > second);
    }

    #[test]
    fn existence_check_is_a_literal_match() {
        let (_dir, mut ledger) = open_temp(&LedgerOptions::default());
        ledger.allocate("/Reel1/Tifs/1.tif").expect("allocate");

        assert!(!ledger.exists("/reel1/tifs/1.tif").expect("exists"));
        assert!(!ledger.exists("Reel1/Tifs/1.tif").expect("exists"));
    }

    #[test]
    fn sequence_survives_reopen_and_ignores_new_offset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ledger.db");

        let last = {
            let mut ledger = Ledger::open(&path, &LedgerOptions::default()).expect("open");
            ledger.allocate("/a.tif").expect("allocate");
            ledger.allocate("/b.tif").expect("allocate")
        };

        let reopened_options = LedgerOptions {
            first_identifier: 1,
            sentinel_name: None,
        };
        let mut ledger = Ledger::open(&path, &reopened_options).expect("reopen");
        assert!(ledger.exists("/a.tif").expect("exists"));
        assert_eq!(ledger.allocate("/c.tif").expect("allocate"), last + 1);
        assert_eq!(
            ledger.entry_count(Some(DEFAULT_SENTINEL_NAME)).expect("count"),
            3
        );
    }

    #[test]
    fn boundary_entries_skip_the_sentinel() {
        let (_dir, mut ledger) = open_temp(&LedgerOptions::default());
        assert!(
            ledger
                .first_entry(Some(DEFAULT_SENTINEL_NAME))
                .expect("first")
                .is_none()
        );

        ledger.allocate("/a.tif").expect("allocate");
        ledger.allocate("/b.tif").expect("allocate");

        let first = ledger
            .first_entry(Some(DEFAULT_SENTINEL_NAME))
            .expect("first")
            .expect("entry");
        let last = ledger
            .last_entry(Some(DEFAULT_SENTINEL_NAME))
            .expect("last")
            .expect("entry");
        assert_eq!(first.relative_path, "/a.tif");
        assert_eq!(last.relative_path, "/b.tif");
        assert_eq!(last.identifier, first.identifier + 1);
    }

    #[test]
    fn overlong_paths_are_rejected_before_insert() {
        let (_dir, mut ledger) = open_temp(&LedgerOptions::default());
        let long = format!("/{}", "x".repeat(600));

        assert!(ledger.allocate(&long).is_err());
        assert_eq!(ledger.entry_count(Some(DEFAULT_SENTINEL_NAME)).expect("count"), 0);
    }

    #[test]
    fn name_limit_counts_characters_not_bytes() {
        let multibyte = format!("/{}", "é".repeat(NAME_MAX_CHARS - 1));
        assert!(multibyte.len() > NAME_MAX_CHARS);
        assert!(name_fits(&multibyte));
        assert!(!name_fits(&format!("{multibyte}x")));
    }
}
