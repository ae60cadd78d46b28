//! Per-request credential for the image-transform service.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// API key supplied with a single submission.
///
/// Deliberately neither `Clone` nor `Serialize`: the key is moved into the
/// job's task and dropped with it. `Debug` never prints the value.
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Returns `None` for blank input.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(SecretString::from(trimmed.to_string())))
    }

    /// Optional form field to optional key.
    pub fn from_form(value: Option<String>) -> Option<Self> {
        value.and_then(Self::new)
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}
