//! CSV upload handler.

use super::{PROCESSED_COUNT_HEADER, SESSION_HEADER, TOTAL_COUNT_HEADER, UPLOAD_FIELD};
use crate::api::AppState;
use crate::error::{ApiError, Error};
use crate::types::SessionArchive;
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Multipart form accepted by POST /upload-csv
#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// CSV file, one `identifier,url` pair per line, no header row
    #[serde(rename = "csvFile")]
    #[schema(value_type = String, format = Binary)]
    csv_file: Vec<u8>,
}

/// POST /upload-csv - Process a CSV upload and return the image archive
#[utoipa::path(
    post,
    path = "/api/upload-csv",
    tag = "upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "ZIP archive of the processed images", content_type = "application/zip",
            headers(
                ("x-upload-session" = String, description = "Session id"),
                ("x-processed-count" = usize, description = "Images in the archive"),
                ("x-total-count" = usize, description = "Input items")
            )
        ),
        (status = 400, description = "Missing, non-CSV or malformed upload", body = ApiError),
        (status = 413, description = "Upload exceeds the size limit", body = ApiError),
        (status = 422, description = "No image could be processed", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn upload_csv(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut csv_content: Option<Vec<u8>> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return multipart_error(e),
        };

        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();

        if !is_csv(&filename, &content_type) {
            return Error::InvalidUpload(format!(
                "only CSV files are accepted (got '{}', {})",
                filename,
                if content_type.is_empty() {
                    "no content type"
                } else {
                    content_type.as_str()
                }
            ))
            .into_response();
        }

        match field.bytes().await {
            Ok(bytes) => csv_content = Some(bytes.to_vec()),
            Err(e) => return multipart_error(e),
        }
    }

    let Some(content) = csv_content else {
        return Error::InvalidUpload(format!(
            "no CSV file provided in '{}' field",
            UPLOAD_FIELD
        ))
        .into_response();
    };

    let upload_path = match save_upload(&state.config.workspace.upload_dir, &content).await {
        Ok(path) => path,
        Err(e) => return e.into_response(),
    };

    tracing::info!(path = ?upload_path, bytes = content.len(), "CSV upload received");

    // A dropped connection does not cancel the session; it still cleans up
    match state.pipeline.process_csv_upload(upload_path).await {
        Ok(archive) => archive_response(archive),
        Err(e) => e.into_response(),
    }
}

fn is_csv(filename: &str, content_type: &str) -> bool {
    let has_csv_extension = Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let mime = content_type.split(';').next().unwrap_or_default().trim();

    has_csv_extension || mime.eq_ignore_ascii_case("text/csv")
}

/// Store the upload as `upload-<uuid>.csv` in the upload directory
async fn save_upload(upload_dir: &Path, content: &[u8]) -> crate::Result<PathBuf> {
    tokio::fs::create_dir_all(upload_dir).await?;

    let path = upload_dir.join(format!("upload-{}.csv", Uuid::new_v4()));
    if let Err(e) = tokio::fs::write(&path, content).await {
        let _ = tokio::fs::remove_file(&path).await;
        return Err(Error::Io(e));
    }

    Ok(path)
}

fn archive_response(archive: SessionArchive) -> Response {
    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", archive.filename),
        ),
        (
            HeaderName::from_static(SESSION_HEADER),
            archive.session_id.to_string(),
        ),
        (
            HeaderName::from_static(PROCESSED_COUNT_HEADER),
            archive.processed.to_string(),
        ),
        (
            HeaderName::from_static(TOTAL_COUNT_HEADER),
            archive.total.to_string(),
        ),
    ];

    (StatusCode::OK, headers, archive.bytes).into_response()
}

/// Body-limit violations surface here as 413
fn multipart_error(e: MultipartError) -> Response {
    let status = e.status();
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "upload_too_large"
    } else {
        "invalid_upload"
    };

    (
        status,
        Json(ApiError::new(code, format!("Failed to read upload: {}", e.body_text()))),
    )
        .into_response()
}
