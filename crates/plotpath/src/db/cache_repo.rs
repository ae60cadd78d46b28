//! Cache repository: CRUD operations for the `ai_image_cache` table.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A raw cache index row.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRow {
    pub cache_key: String,
    pub input_hash: String,
    pub prompt: String,
    pub output_filename: String,
    pub mime_type: String,
    pub created_at: Option<String>,
}

impl CacheRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            cache_key: row.get("cache_key")?,
            input_hash: row.get("input_hash")?,
            prompt: row.get("prompt")?,
            output_filename: row.get("output_filename")?,
            mime_type: row.get("mime_type")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a row, replacing any existing row with the same key.
pub fn upsert(db: &Database, row: &CacheRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT OR REPLACE INTO ai_image_cache
             (cache_key, input_hash, prompt, output_filename, mime_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, COALESCE(?6, CURRENT_TIMESTAMP))",
            params![
                row.cache_key,
                row.input_hash,
                row.prompt,
                row.output_filename,
                row.mime_type,
                row.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a row by its composite key.
pub fn find_by_key(db: &Database, cache_key: &str) -> Result<Option<CacheRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT cache_key, input_hash, prompt, output_filename, mime_type, created_at
                 FROM ai_image_cache WHERE cache_key = ?1",
                params![cache_key],
                CacheRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Deletes a row by key. Returns whether a row was removed.
pub fn delete_by_key(db: &Database, cache_key: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "DELETE FROM ai_image_cache WHERE cache_key = ?1",
            params![cache_key],
        )?;
        Ok(affected > 0)
    })
}

/// Counts all rows.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM ai_image_cache", [], |r| r.get(0))?;
        Ok(count)
    })
}
