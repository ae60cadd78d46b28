use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ApiKey, ImageTransformer, TransformError, TransformRequest, TransformedImage};

pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp:generateContent";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiTransformer {
    client: Client,
    endpoint: String,
}

impl GeminiTransformer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransformError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransformError::Client(e.without_url().to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ImageTransformer for GeminiTransformer {
    async fn transform(
        &self,
        request: TransformRequest<'_>,
        credential: &ApiKey,
    ) -> Result<TransformedImage, TransformError> {
        let body = build_request_body(&request);

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, credential.expose())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(parse_error_body(status.as_u16(), &bytes));
        }
        parse_success_body(&bytes)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    Image { inline_data: InlineDataOut<'a> },
}

#[derive(Debug, Serialize)]
struct InlineDataOut<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseModalities")]
    response_modalities: [&'static str; 2],
}

pub(crate) fn build_request_body<'a>(request: &TransformRequest<'a>) -> GenerateRequest<'a> {
    GenerateRequest {
        contents: vec![RequestContent {
            parts: vec![
                RequestPart::Text {
                    text: request.prompt,
                },
                RequestPart::Image {
                    inline_data: InlineDataOut {
                        mime_type: request.mime_type,
                        data: STANDARD.encode(request.image),
                    },
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_modalities: ["text", "image"],
        },
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineDataIn>,
}

#[derive(Debug, Deserialize)]
struct InlineDataIn {
    #[serde(rename = "mimeType", default)]
    mime_type: String,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

/// First inline image across all candidates.
pub(crate) fn parse_success_body(body: &[u8]) -> Result<TransformedImage, TransformError> {
    let response: GenerateResponse =
        serde_json::from_slice(body).map_err(|e| TransformError::Parse(e.to_string()))?;

    let inline = response
        .candidates
        .into_iter()
        .flat_map(|candidate| candidate.content.parts)
        .find_map(|part| part.inline_data)
        .ok_or(TransformError::NoImage)?;

    Ok(TransformedImage {
        bytes: STANDARD.decode(inline.data.as_bytes())?,
        mime_type: inline.mime_type,
    })
}

pub(crate) fn parse_error_body(status: u16, body: &[u8]) -> TransformError {
    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => TransformError::Api(parsed.error.message),
        _ => TransformError::Status(status),
    }
}
