pub mod clean_source;
pub mod ingest;
pub mod status;
