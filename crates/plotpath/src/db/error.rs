use std::path::PathBuf;
use thiserror::Error;

/// Failures of the cache index.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to create index directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The index is left at the previous version.
    #[error("Cache index migration v{version} ({description}) failed: {reason}")]
    Migration {
        version: u32,
        description: &'static str,
        reason: String,
    },

    #[error("Cache index lock poisoned")]
    LockPoisoned,
}
