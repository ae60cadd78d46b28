//! Content-addressed cache of image-transform results.
//!
//! Maps `(input fingerprint, prompt)` to a blob on disk plus an index row
//! in SQLite. Lookups self-heal: a row whose blob has vanished is purged
//! and reported as a miss.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;

use crate::db::cache_repo::{self, CacheRow};
use crate::db::{Database, DatabaseError};

pub mod key;

pub use key::{cache_key, prompt_digest, Fingerprint, DEFAULT_PROMPT};

/// Errors from the result cache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache index error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Cache IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A cached transformation result.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResult {
    /// Blob filename inside the cache directory.
    pub filename: String,
    pub mime_type: String,
    /// Path of the blob inside the cache directory.
    pub full_path: PathBuf,
    /// Prompt stored alongside the entry.
    pub prompt: String,
}

/// Result cache backed by a SQLite index and a blob directory.
#[derive(Clone)]
pub struct ResultCache {
    db: Database,
    blob_dir: PathBuf,
}

/// Removes a blob left behind by a failed store. Returns whether the file
/// is gone.
fn discard_blob(path: &Path, reason: &str) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            log::warn!(
                "Failed to remove blob {} after {}: {}",
                path.display(),
                reason,
                e
            );
            false
        }
    }
}

impl ResultCache {
    /// Opens or creates the index at `index_path`, creates `blob_dir` and
    /// migrates a legacy index before returning.
    pub fn open(index_path: &Path, blob_dir: &Path) -> Result<Self, CacheError> {
        Self::create_blob_dir(blob_dir)?;
        let db = Database::open(index_path)?;
        Ok(Self {
            db,
            blob_dir: blob_dir.to_path_buf(),
        })
    }

    /// Cache with an in-memory index, for tests.
    pub fn open_in_memory(blob_dir: &Path) -> Result<Self, CacheError> {
        Self::create_blob_dir(blob_dir)?;
        Ok(Self {
            db: Database::open_in_memory()?,
            blob_dir: blob_dir.to_path_buf(),
        })
    }

    fn create_blob_dir(blob_dir: &Path) -> Result<(), CacheError> {
        std::fs::create_dir_all(blob_dir).map_err(|e| CacheError::Io {
            path: blob_dir.to_path_buf(),
            source: e,
        })
    }

    pub fn blob_dir(&self) -> &Path {
        &self.blob_dir
    }

    /// Looks up a cached result for the given input and prompt.
    pub fn lookup(
        &self,
        fingerprint: &Fingerprint,
        prompt: &str,
    ) -> Result<Option<CachedResult>, CacheError> {
        let key = cache_key(fingerprint, prompt);

        let Some(row) = cache_repo::find_by_key(&self.db, &key)? else {
            return Ok(None);
        };

        let full_path = self.blob_dir.join(&row.output_filename);
        if !full_path.is_file() {
            log::warn!(
                "Cache blob {} missing, dropping stale entry for {}",
                row.output_filename,
                fingerprint.short()
            );
            if let Err(e) = cache_repo::delete_by_key(&self.db, &key) {
                log::warn!("Failed to purge stale cache entry: {}", e);
            }
            return Ok(None);
        }

        Ok(Some(CachedResult {
            filename: row.output_filename,
            mime_type: row.mime_type,
            full_path,
            prompt: row.prompt,
        }))
    }

    /// Writes a new blob and points the index at it.
    ///
    /// If the index write fails the blob is removed again, so the cache
    /// directory never accumulates unreferenced files from failed stores.
    pub fn store(
        &self,
        fingerprint: &Fingerprint,
        prompt: &str,
        data: &[u8],
        mime_type: &str,
    ) -> Result<CachedResult, CacheError> {
        let (filename, full_path) = self.write_unique_blob(fingerprint, data, mime_type)?;

        let row = CacheRow {
            cache_key: cache_key(fingerprint, prompt),
            input_hash: fingerprint.as_str().to_string(),
            prompt: prompt.to_string(),
            output_filename: filename.clone(),
            mime_type: mime_type.to_string(),
            created_at: Some(Utc::now().to_rfc3339()),
        };

        if let Err(e) = cache_repo::upsert(&self.db, &row) {
            discard_blob(&full_path, "index error");
            return Err(e.into());
        }

        log::debug!("Cached {} as {}", fingerprint.short(), filename);

        Ok(CachedResult {
            filename,
            mime_type: mime_type.to_string(),
            full_path,
            prompt: prompt.to_string(),
        })
    }

    /// Creates `<prefix>_<nanos><ext>` exclusively, bumping the timestamp on
    /// the rare collision.
    fn write_unique_blob(
        &self,
        fingerprint: &Fingerprint,
        data: &[u8],
        mime_type: &str,
    ) -> Result<(String, PathBuf), CacheError> {
        let ext = key::extension_for_mime(mime_type);
        let mut stamp = Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_else(|| Utc::now().timestamp_micros() * 1_000);

        loop {
            let filename = format!("{}_{}{}", fingerprint.short(), stamp, ext);
            let full_path = self.blob_dir.join(&filename);

            match OpenOptions::new().write(true).create_new(true).open(&full_path) {
                Ok(mut file) => {
                    let written = file.write_all(data).and_then(|_| file.sync_all());
                    if let Err(e) = written {
                        discard_blob(&full_path, "write error");
                        return Err(CacheError::Io {
                            path: full_path,
                            source: e,
                        });
                    }
                    return Ok((filename, full_path));
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    stamp += 1;
                }
                Err(e) => {
                    return Err(CacheError::Io {
                        path: full_path,
                        source: e,
                    })
                }
            }
        }
    }

    /// Number of index rows. Used by diagnostics and tests.
    pub fn len(&self) -> Result<u64, CacheError> {
        Ok(cache_repo::count(&self.db)?)
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    #[cfg(test)]
    pub(crate) fn database(&self) -> &Database {
        &self.db
    }
}
