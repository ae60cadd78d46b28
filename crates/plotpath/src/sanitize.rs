//! Helpers for sanitizing data before it enters tracing span attributes
//! or job logs.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields: reveals the file name without exposing where the
/// data directory lives.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Strips the query string from a URL, where API keys tend to end up.
///
/// - `https://host/v1/models:generate?key=abc` → `https://host/v1/models:generate`
/// - `https://host/v1/models:generate` → unchanged
pub fn redact_query(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => base.to_string(),
        None => url.to_string(),
    }
}
