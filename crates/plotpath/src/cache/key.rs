//! Content fingerprints and composite cache keys.

use std::fmt;
use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

/// Prompt used when the submitter does not provide one. Rows written by
/// the legacy key scheme are migrated under this prompt.
pub const DEFAULT_PROMPT: &str = "Reduce this image to a two color line-art image suitable for use in a \
child's coloring book. The lines should be black and the background \
white. The image will be reproduced by an X-Y plotter, so the final \
image should have only lines (no solid/filled areas).";

/// Number of hex characters kept from a prompt digest and from the
/// fingerprint prefix used in blob filenames.
const SHORT_LEN: usize = 16;

/// Lowercase hex SHA-256 digest identifying an input image by content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprints an in-memory buffer.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(data)))
    }

    /// Fingerprints a file by streaming its contents.
    pub async fn of_file(path: &Path) -> std::io::Result<Self> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Wraps an already computed hex digest (e.g. read back from the index).
    /// Anything but a non-empty run of hex digits is rejected.
    pub fn from_hex(hex: impl Into<String>) -> Option<Self> {
        let hex = hex.into();
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(hex.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 16 hex characters, for log lines and blob filenames.
    pub fn short(&self) -> &str {
        self.0.get(..SHORT_LEN).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Truncated SHA-256 of the prompt text. Keeps keys short no matter how
/// long the prompt is.
pub fn prompt_digest(prompt: &str) -> String {
    let mut digest = hex::encode(Sha256::digest(prompt.as_bytes()));
    digest.truncate(SHORT_LEN);
    digest
}

/// Composite index key: `<fingerprint>:<prompt digest>`.
pub fn cache_key(fingerprint: &Fingerprint, prompt: &str) -> String {
    format!("{}:{}", fingerprint, prompt_digest(prompt))
}

/// File extension for a blob of the given media type.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => ".jpg",
        "image/webp" => ".webp",
        "image/gif" => ".gif",
        _ => ".png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_of_bytes_is_sha256_hex() {
        let fp = Fingerprint::of_bytes(b"abc");
        assert_eq!(
            fp.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(fp.short(), "ba7816bf8f01cfea");
    }

    #[tokio::test]
    async fn test_fingerprint_of_file_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.png");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let from_file = Fingerprint::of_file(&path).await.unwrap();
        assert_eq!(from_file, Fingerprint::of_bytes(&data));
    }

    #[test]
    fn test_cache_key_is_deterministic() {
        let fp = Fingerprint::from_hex("deadbeef").unwrap();
        assert_eq!(cache_key(&fp, "prompt"), cache_key(&fp, "prompt"));
        assert_ne!(cache_key(&fp, "prompt"), cache_key(&fp, "other prompt"));
        assert!(cache_key(&fp, "prompt").starts_with("deadbeef:"));
    }

    #[test]
    fn test_prompt_digest_length() {
        assert_eq!(prompt_digest(DEFAULT_PROMPT).len(), 16);
        assert_eq!(prompt_digest("").len(), 16);
    }

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for_mime("image/jpeg"), ".jpg");
        assert_eq!(extension_for_mime("image/webp"), ".webp");
        assert_eq!(extension_for_mime("image/gif"), ".gif");
        assert_eq!(extension_for_mime("image/png"), ".png");
        assert_eq!(extension_for_mime("application/octet-stream"), ".png");
    }

    #[test]
    fn test_short_on_short_input() {
        assert_eq!(Fingerprint::from_hex("abc").unwrap().short(), "abc");
    }

    #[test]
    fn test_from_hex_rejects_non_hex() {
        assert!(Fingerprint::from_hex("").is_none());
        assert!(Fingerprint::from_hex("xyz").is_none());
        assert!(Fingerprint::from_hex("0123456789abcde\u{e9}").is_none());
        assert!(Fingerprint::from_hex("\u{732b}".repeat(8)).is_none());
    }

    #[test]
    fn test_from_hex_normalizes_case() {
        let fp = Fingerprint::from_hex("DEADBEEF0123456789").unwrap();
        assert_eq!(fp.as_str(), "deadbeef0123456789");
        assert_eq!(fp.short(), "deadbeef01234567");
    }
}
