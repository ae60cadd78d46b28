//! AI image transformation.
//!
//! The pipeline only sees the [`ImageTransformer`] trait; the production
//! implementation talks to Gemini, tests substitute their own.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

pub mod credential;
pub mod gemini;

pub use credential::ApiKey;
pub use gemini::GeminiTransformer;

/// Media type assumed when the extension is unknown.
pub const FALLBACK_MIME_TYPE: &str = "image/png";

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("API request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("API error (status {0})")]
    Status(u16),

    #[error("parse response: {0}")]
    Parse(String),

    #[error("decode image: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("no image in API response")]
    NoImage,
}

impl From<reqwest::Error> for TransformError {
    fn from(e: reqwest::Error) -> Self {
        // Endpoint URLs never reach logs or job output.
        TransformError::Request(e.without_url())
    }
}

/// One transformation request.
#[derive(Debug, Clone, Copy)]
pub struct TransformRequest<'a> {
    pub image: &'a [u8],
    pub mime_type: &'a str,
    pub prompt: &'a str,
}

/// Image returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[async_trait]
pub trait ImageTransformer: Send + Sync {
    async fn transform(
        &self,
        request: TransformRequest<'_>,
        credential: &ApiKey,
    ) -> Result<TransformedImage, TransformError>;
}

/// Media type for an input image, guessed from its extension.
pub fn input_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string())
}
