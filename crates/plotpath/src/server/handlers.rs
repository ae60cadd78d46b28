use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use super::error::AppError;
use super::AppState;
use crate::jobs::{JobId, JobRequest, RawJobRequest};
use crate::service::{JobStatusView, Upload};
use crate::transform::ApiKey;

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub hostname: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub job_id: JobId,
}

pub async fn index(State(state): State<AppState>) -> Json<IndexResponse> {
    Json(IndexResponse {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        hostname: state.hostname.clone(),
    })
}

/// Accepts the multipart form, starts the job and redirects to its status.
#[instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut image: Option<Upload> = None;
    let mut raw = RawJobRequest::default();
    let mut api_key: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "image" {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let bytes = field.bytes().await?;
            image = Some(Upload {
                filename,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let slot = match name.as_str() {
            "maxWidth" => &mut raw.max_width,
            "maxHeight" => &mut raw.max_height,
            "toolOn" => &mut raw.tool_on,
            "toolOff" => &mut raw.tool_off,
            "useAI" => &mut raw.use_ai,
            "aiPrompt" => &mut raw.prompt,
            "apiKey" => &mut api_key,
            _ => continue, // Ignore unknown fields.
        };
        *slot = Some(field.text().await?);
    }

    let image = image.ok_or_else(|| AppError::Validation("Missing 'image' field".into()))?;
    let credential = ApiKey::from_form(api_key);
    let job_id = state
        .service
        .submit(image, JobRequest::from(raw), credential)
        .await?;

    let location = format!("/job/{}", job_id);
    Ok((
        StatusCode::SEE_OTHER,
        [(header::LOCATION, location)],
        Json(UploadResponse { job_id }),
    )
        .into_response())
}

pub async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobStatusView>, AppError> {
    let not_found = || AppError::NotFound("Job not found".into());
    let id: JobId = id.parse().map_err(|_| not_found())?;
    state.service.status(id).await.map(Json).ok_or_else(not_found)
}

pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let not_available = || AppError::NotFound("File not available".into());
    let id: JobId = id.parse().map_err(|_| not_available())?;
    let artifact = state.service.artifact(id)?;

    let file = tokio::fs::File::open(&artifact.path)
        .await
        .map_err(|_| not_available())?;
    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&artifact.download_name),
        )
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

/// `attachment; filename="..."` with characters that would break the
/// quoted string dropped.
fn content_disposition_value(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .filter(|c| (c.is_ascii_graphic() || *c == ' ') && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let name = if safe.trim().is_empty() {
        "output.gcode".to_string()
    } else {
        safe
    };
    format!("attachment; filename=\"{}\"", name)
}
