//! The ingest orchestrator (C4, §4.4): validates an upload, stores the
//! bytes, transactionally creates the Document+Job pair, then dispatches to
//! the worker under a hard deadline. A dispatch failure never fails the
//! upload — the job stays Pending and is the responsibility of a future
//! reconciler (spec §9 Open Questions).

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use docflow_core::tuning::{is_allowed_mime_type, DISPATCH_TIMEOUT, UPLOAD_SIZE_LIMIT_BYTES};
use docflow_core::{DocumentId, JobId, OwnerId};
use docflow_proto::v1::StartProcessingRequest;
use serde::Serialize;
use tracing::warn;

const TITLE_MAX_LEN: usize = 500;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub document_id: DocumentId,
    pub job_id: JobId,
    pub status: String,
    pub title: String,
    pub storage_key: String,
    pub size: i64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

struct UploadField {
    filename: String,
    mime_type: String,
    bytes: bytes::Bytes,
}

fn default_title(filename: &str, provided: Option<String>) -> String {
    let title = provided
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| filename.trim().to_string());
    if title.chars().count() > TITLE_MAX_LEN {
        title.chars().take(TITLE_MAX_LEN).collect()
    } else {
        title
    }
}

async fn collect_multipart(mut multipart: Multipart) -> Result<(Option<String>, Option<UploadField>), ApiError> {
    let mut title: Option<String> = None;
    let mut file: Option<UploadField> = None;

    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::MissingFile(format!("malformed multipart body: {err}")))?;
        let Some(field) = field else { break };

        match field.name() {
            Some("title") => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ApiError::MissingFile(format!("malformed title field: {err}")))?;
                title = Some(text);
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::MissingFile(format!("malformed file field: {err}")))?;
                file = Some(UploadField { filename, mime_type, bytes });
            }
            _ => {}
        }
    }

    Ok((title, file))
}

/// `POST /documents/upload`.
///
/// Authentication and token issuance live outside the core (spec §1
/// out-of-scope); until a real auth layer is wired in front of this
/// service, the caller's identity is read from an `X-Owner-Id` header
/// stand-in so the ingest path stays exercisable standalone.
pub async fn upload_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let owner_id = headers
        .get("x-owner-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| uuid::Uuid::parse_str(v).ok())
        .map(OwnerId::from)
        .unwrap_or_default();

    match upload_document_inner(state, multipart, owner_id).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn upload_document_inner(
    state: AppState,
    multipart: Multipart,
    owner_id: OwnerId,
) -> Result<Response, ApiError> {
    let (title_field, file) = collect_multipart(multipart).await?;

    let file = file.ok_or_else(|| ApiError::MissingFile("no file field in upload".to_string()))?;
    if file.bytes.is_empty() {
        return Err(ApiError::MissingFile("uploaded file is empty".to_string()));
    }
    if file.bytes.len() as u64 > UPLOAD_SIZE_LIMIT_BYTES {
        return Err(ApiError::PayloadTooLarge(format!(
            "upload exceeds the {UPLOAD_SIZE_LIMIT_BYTES}-byte limit"
        )));
    }
    if !is_allowed_mime_type(&file.mime_type) {
        return Err(ApiError::UnsupportedMediaType(format!(
            "{} is not one of the accepted media types ({})",
            file.mime_type,
            docflow_core::tuning::ALLOWED_MIME_TYPES.join(", ")
        )));
    }

    let title = default_title(&file.filename, title_field);
    let size_bytes = file.bytes.len() as i64;

    let storage_key = state
        .object_store
        .put(file.bytes, &file.filename)
        .await?;

    let (document_id, job_id) = state
        .store
        .create_document_and_job(owner_id, &title, &storage_key, &file.mime_type, size_bytes)
        .await?;

    let mut status = "pending".to_string();
    let mut http_status = StatusCode::ACCEPTED;

    let dispatch = tokio::time::timeout(
        DISPATCH_TIMEOUT,
        state.worker_client.clone().start_processing(StartProcessingRequest {
            document_id: document_id.to_string(),
            owner_id: owner_id.to_string(),
            storage_key: storage_key.clone(),
            mime_type: file.mime_type.clone(),
        }),
    )
    .await;

    match dispatch {
        Ok(Ok(response)) => {
            status = response.into_inner().status;
            http_status = StatusCode::CREATED;
        }
        Ok(Err(err)) => {
            warn!(%job_id, %err, "worker dispatch failed, job remains pending");
        }
        Err(_) => {
            warn!(%job_id, "worker dispatch timed out after {DISPATCH_TIMEOUT:?}, job remains pending");
        }
    }

    let body = UploadResponse {
        document_id,
        job_id,
        status,
        title,
        storage_key,
        size: size_bytes,
        mime_type: file.mime_type,
        created_at: Utc::now(),
    };

    Ok((http_status, Json(body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_defaults_to_trimmed_filename_when_absent() {
        assert_eq!(default_title("  roadmap.pdf  ", None), "roadmap.pdf");
    }

    #[test]
    fn title_defaults_to_trimmed_filename_when_blank() {
        assert_eq!(default_title("roadmap.pdf", Some("   ".to_string())), "roadmap.pdf");
    }

    #[test]
    fn provided_title_is_trimmed_and_used() {
        assert_eq!(
            default_title("roadmap.pdf", Some("  Roadmap  ".to_string())),
            "Roadmap"
        );
    }

    #[test]
    fn title_is_truncated_to_max_length() {
        let long = "x".repeat(600);
        let title = default_title("file.pdf", Some(long));
        assert_eq!(title.chars().count(), TITLE_MAX_LEN);
    }
}
