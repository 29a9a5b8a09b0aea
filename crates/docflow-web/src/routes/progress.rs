//! The progress stream bridge (C5, §4.5): validates a job, emits a durable
//! snapshot, subscribes to the ephemeral event channel, multiplexes
//! heartbeats and a lifetime timeout, and tears everything down
//! deterministically on any exit path. Mirrors the teacher's
//! `workbench_sse` handler in `stewardship_routes.rs` (`Sse<impl
//! Stream<Item = Result<Event, Infallible>>>`), generalized from a
//! `tokio::sync::broadcast` map to the shared `EventBus`.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONNECTION};
use axum::http::HeaderValue;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use docflow_core::tuning::{HEARTBEAT_INTERVAL, SSE_RETRY_MS, STREAM_MAX_LIFETIME};
use docflow_core::{channel_name, DocumentId, JobId, JobStatus, ProcessingJob, ProgressEvent};
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientPayload {
    job_id: JobId,
    document_id: DocumentId,
    percent: i32,
    stage: String,
    message: String,
    current_page: i32,
    total_pages: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    timestamp: DateTime<Utc>,
}

fn snapshot_message(job: &ProcessingJob) -> String {
    match job.status {
        JobStatus::Pending => "Job is queued for processing".to_string(),
        JobStatus::Running => format!("Processing in progress — {}% complete", job.progress),
        JobStatus::Completed => "Processing completed successfully".to_string(),
        JobStatus::Failed => job
            .error_message
            .clone()
            .unwrap_or_else(|| "Processing failed".to_string()),
    }
}

fn snapshot_payload(job: &ProcessingJob) -> ClientPayload {
    ClientPayload {
        job_id: job.id,
        document_id: job.document_id,
        percent: job.progress,
        stage: job.status.as_str().to_uppercase(),
        message: snapshot_message(job),
        current_page: 0,
        total_pages: 0,
        error_message: job.error_message.clone(),
        timestamp: job.updated_at,
    }
}

fn event_payload(document_id: DocumentId, event: &ProgressEvent) -> ClientPayload {
    ClientPayload {
        job_id: event.job_id,
        document_id,
        percent: event.progress,
        stage: event.status.as_str().to_uppercase(),
        message: event.message.clone(),
        current_page: event.current_page,
        total_pages: event.total_pages,
        error_message: event.error_message.clone(),
        timestamp: event.published_at,
    }
}

/// Builds one wire frame: `id: {counter}\nevent: {name}\ndata: {json}\n\n`.
fn frame(counter: u64, name: &str, payload: &ClientPayload) -> Event {
    let json = serde_json::to_string(payload).unwrap_or_default();
    Event::default().id(counter.to_string()).event(name).data(json)
}

#[derive(Serialize)]
struct TimeoutBody {
    job_id: JobId,
    message: String,
}

fn timeout_frame(counter: u64, job_id: JobId) -> Event {
    let body = TimeoutBody {
        job_id,
        message: "Stream timed out — please reconnect or check job status via API".to_string(),
    };
    Event::default()
        .id(counter.to_string())
        .event("timeout")
        .data(serde_json::to_string(&body).unwrap_or_default())
}

/// Wire shape of the `error` frame (§4.5.2 step 6d): unlike `ClientPayload`,
/// it carries no `documentId` — the spec's shape is `{ jobId, stage, percent,
/// message, errorMessage, timestamp }`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    job_id: JobId,
    stage: String,
    percent: i32,
    message: String,
    error_message: String,
    timestamp: DateTime<Utc>,
}

fn error_frame(counter: u64, job_id: JobId, error_message: &str) -> Event {
    let body = ErrorBody {
        job_id,
        stage: "FAILED".to_string(),
        percent: 0,
        message: "Stream error — please retry".to_string(),
        error_message: error_message.to_string(),
        timestamp: Utc::now(),
    };
    Event::default()
        .id(counter.to_string())
        .event("error")
        .data(serde_json::to_string(&body).unwrap_or_default())
}

/// `GET /documents/{jobId}/progress`.
pub async fn stream_progress(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> Response {
    let job = match state.store.find_job_by_id(job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => return ApiError::NotFound(format!("job {job_id} not found")).into_response(),
        Err(err) => return ApiError::from(err).into_response(),
    };

    let snapshot = frame(1, "progress", &snapshot_payload(&job));

    if job.status.is_terminal() {
        // Steps 3-4 (retry directive, then snapshot) still apply before the
        // terminal short-circuit of step 5 — a reconnecting client on an
        // already-finished job should still learn the reconnect interval.
        let retry = Event::default().retry(Duration::from_millis(SSE_RETRY_MS));
        let stream = futures::stream::iter(vec![Ok::<Event, Infallible>(retry), Ok(snapshot)]);
        return with_sse_headers(Sse::new(stream).into_response());
    }

    let bus = state.bus.clone();
    let document_id = job.document_id;
    let channel = channel_name(job_id);

    let stream = async_stream::stream! {
        yield Ok::<Event, Infallible>(
            Event::default().retry(Duration::from_millis(SSE_RETRY_MS)),
        );
        yield Ok(snapshot);
        let mut counter: u64 = 1;

        let mut sub = match bus.subscribe(&channel).await {
            Ok(sub) => sub,
            Err(err) => {
                counter += 1;
                yield Ok(error_frame(counter, job_id, &err.to_string()));
                return;
            }
        };

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await; // first tick fires immediately; discard it

        let deadline = tokio::time::sleep(STREAM_MAX_LIFETIME);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    counter += 1;
                    yield Ok(timeout_frame(counter, job_id));
                    return;
                }
                _ = heartbeat.tick() => {
                    yield Ok(Event::default().comment("heartbeat"));
                }
                item = futures::StreamExt::next(&mut sub) => {
                    match item {
                        Some(Ok(payload)) => {
                            match serde_json::from_slice::<ProgressEvent>(&payload) {
                                Ok(event) => {
                                    counter += 1;
                                    let terminal = event.status.is_terminal();
                                    yield Ok(frame(counter, "progress", &event_payload(document_id, &event)));
                                    if terminal {
                                        return;
                                    }
                                }
                                Err(err) => {
                                    warn!(%err, "dropping malformed progress event");
                                }
                            }
                        }
                        Some(Err(err)) => {
                            counter += 1;
                            yield Ok(error_frame(counter, job_id, &err.to_string()));
                            return;
                        }
                        None => return,
                    }
                }
            }
        }
    };

    with_sse_headers(Sse::new(stream).into_response())
}

fn with_sse_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert("X-Accel-Buffering", HeaderValue::from_static("no"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_core::{DocumentId, JobId};

    fn base_job(status: JobStatus) -> ProcessingJob {
        ProcessingJob {
            id: JobId::new(),
            document_id: DocumentId::new(),
            status,
            progress: 42,
            result: None,
            error_message: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn snapshot_message_reflects_each_status() {
        assert_eq!(snapshot_message(&base_job(JobStatus::Pending)), "Job is queued for processing");
        assert!(snapshot_message(&base_job(JobStatus::Running)).contains("42%"));
        assert_eq!(
            snapshot_message(&base_job(JobStatus::Completed)),
            "Processing completed successfully"
        );
        let mut failed = base_job(JobStatus::Failed);
        failed.error_message = Some("boom".to_string());
        assert_eq!(snapshot_message(&failed), "boom");
    }

    #[test]
    fn snapshot_payload_uses_uppercase_stage() {
        let payload = snapshot_payload(&base_job(JobStatus::Running));
        assert_eq!(payload.stage, "RUNNING");
        assert_eq!(payload.current_page, 0);
        assert_eq!(payload.total_pages, 0);
    }

    #[test]
    fn event_payload_carries_page_counters() {
        let document_id = DocumentId::new();
        let event = ProgressEvent {
            job_id: JobId::new(),
            document_id,
            status: JobStatus::Running,
            progress: 55,
            message: "Processing page 7 of 12".to_string(),
            current_page: 7,
            total_pages: 12,
            error_message: None,
            published_at: Utc::now(),
        };
        let payload = event_payload(document_id, &event);
        assert_eq!(payload.current_page, 7);
        assert_eq!(payload.stage, "RUNNING");
    }

    #[test]
    fn error_body_has_no_document_id_field() {
        let body = ErrorBody {
            job_id: JobId::new(),
            stage: "FAILED".to_string(),
            percent: 0,
            message: "Stream error — please retry".to_string(),
            error_message: "boom".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("documentId"));
    }
}
