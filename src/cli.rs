use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "bni-archiver",
    version,
    about = "Batch scanned newspaper page images into the numbered archive"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assign identifiers to a source tree, move it into a new batch and sync it.
    Ingest(IngestArgs),
    /// Report ledger state and the batch name the next run would use.
    Status(StatusArgs),
    /// Remove a source tree once every primary file has been archived out of it.
    CleanSource(CleanSourceArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// The source tree to move files from.
    #[arg(short = 's', long = "source")]
    pub source_path: PathBuf,

    /// Destination root for primary (TIF) files.
    #[arg(short = 'b', long = "bni")]
    pub bni_path: PathBuf,

    /// Destination root for companion (JPG) files.
    #[arg(short = 'l', long = "lib")]
    pub lib_path: PathBuf,

    /// Mounted remote tree consulted only to compute the next batch name. Never written to.
    #[arg(short = 't', long = "target")]
    pub target_path: PathBuf,

    /// Manually override the batch name, e.g. 000049.
    #[arg(short = 'n', long = "next")]
    pub next_dir: Option<String>,

    #[arg(long, default_value = "bni_images.db")]
    pub ledger_path: PathBuf,

    #[arg(long, default_value_t = 400)]
    pub min_files: usize,

    #[arg(long, default_value_t = 2000)]
    pub max_files: usize,

    #[arg(long, default_value = "tif")]
    pub primary_ext: String,

    #[arg(long, default_value = "jpg")]
    pub companion_ext: String,

    /// Name of the directory, sibling to each primary file's parent, holding companions.
    #[arg(long, default_value = "Jpgs")]
    pub companion_dir: String,

    /// Subdirectories the target tree must contain before anything runs.
    #[arg(long = "sentinel-dir", default_values_t = [String::from("000007"), String::from("000028")])]
    pub sentinel_dirs: Vec<String>,

    #[arg(long, default_value = "bni-digital-archives-scans")]
    pub bucket: String,

    #[arg(long, default_value = "aws")]
    pub sync_program: String,

    #[arg(long, default_value_t = false)]
    pub skip_sync: bool,

    /// Run every pre-flight check and stop before moving anything.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long, default_value = "manifests")]
    pub manifest_dir: PathBuf,

    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "bni_images.db")]
    pub ledger_path: PathBuf,

    #[arg(short = 't', long = "target")]
    pub target_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CleanSourceArgs {
    #[arg(short = 's', long = "source")]
    pub source_path: PathBuf,

    #[arg(long, default_value = "tif")]
    pub primary_ext: String,
}
