//! The `WorkerService` gRPC surface (§4.3.1): `StartProcessing` (unary) and
//! `ObserveProgress` (server-streaming), backed by the `DocumentStore` (C2)
//! and `EventBus` (C1).

use crate::engine;
use chrono::Utc;
use docflow_core::{channel_name, DocumentId, DocumentStatus, JobStatus, OwnerId, ProcessingJob};
use docflow_eventbus::EventBus;
use docflow_proto::v1::worker_service_server::WorkerService;
use docflow_proto::v1::{
    ObserveProgressRequest, ProgressUpdate, StartProcessingRequest, StartProcessingResponse,
};
use docflow_store::DocumentStore;
use futures::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::instrument;
use uuid::Uuid;

pub struct WorkerServiceImpl {
    store: DocumentStore,
    bus: Arc<dyn EventBus>,
}

impl WorkerServiceImpl {
    pub fn new(store: DocumentStore, bus: Arc<dyn EventBus>) -> Self {
        Self { store, bus }
    }
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid, Status> {
    if value.is_empty() {
        return Err(Status::invalid_argument(format!("{field} must not be empty")));
    }
    Uuid::parse_str(value).map_err(|_| Status::invalid_argument(format!("{field} is not a valid UUID")))
}

fn to_timestamp(dt: chrono::DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: dt.timestamp(),
        nanos: dt.timestamp_subsec_nanos() as i32,
    }
}

fn job_to_update(job: &ProcessingJob) -> ProgressUpdate {
    ProgressUpdate {
        job_id: job.id.to_string(),
        status: job.status.as_str().to_string(),
        progress: job.progress,
        error_message: job.error_message.clone(),
        updated_at: Some(to_timestamp(job.updated_at)),
    }
}

type ProgressStream = Pin<Box<dyn futures::Stream<Item = Result<ProgressUpdate, Status>> + Send>>;

#[tonic::async_trait]
impl WorkerService for WorkerServiceImpl {
    #[instrument(skip(self, request))]
    async fn start_processing(
        &self,
        request: Request<StartProcessingRequest>,
    ) -> Result<Response<StartProcessingResponse>, Status> {
        let req = request.into_inner();
        let document_id = DocumentId::from(parse_uuid("document_id", &req.document_id)?);
        let owner_id = OwnerId::from(parse_uuid("owner_id", &req.owner_id)?);

        let _document = self
            .store
            .find_document(document_id, Some(owner_id))
            .await
            .map_err(|err| Status::internal(err.to_string()))?
            .ok_or_else(|| Status::not_found(format!("document {document_id} not found")))?;

        // Idempotence under retry: a Running job already means this document
        // is already being driven by a prior StartProcessing call.
        if let Some(running) = self
            .store
            .find_running_job_for_document(document_id)
            .await
            .map_err(|err| Status::internal(err.to_string()))?
        {
            return Ok(Response::new(StartProcessingResponse {
                job_id: running.id.to_string(),
                status: running.status.as_str().to_string(),
                accepted_at: Some(to_timestamp(running.started_at.unwrap_or(running.created_at))),
            }));
        }

        // Reuse the Pending job created by ingestion (`createDocumentAndJob`)
        // when one exists, rather than minting a second row for the same
        // attempt; otherwise (e.g. a future reconciler re-driving an
        // orphaned document) mint a fresh Pending job.
        let job_id = match self
            .store
            .find_pending_job_for_document(document_id)
            .await
            .map_err(|err| Status::internal(err.to_string()))?
        {
            Some(pending) => pending.id,
            None => self
                .store
                .create_job_for_document(document_id)
                .await
                .map_err(|err| Status::internal(err.to_string()))?,
        };

        self.store
            .update_document(document_id, docflow_store::DocumentPatch::status(DocumentStatus::Processing))
            .await
            .map_err(|err| Status::internal(err.to_string()))?;

        engine::spawn_job(self.store.clone(), self.bus.clone(), document_id, job_id);

        Ok(Response::new(StartProcessingResponse {
            job_id: job_id.to_string(),
            status: JobStatus::Pending.as_str().to_string(),
            accepted_at: Some(to_timestamp(Utc::now())),
        }))
    }

    type ObserveProgressStream = ProgressStream;

    #[instrument(skip(self, request))]
    async fn observe_progress(
        &self,
        request: Request<ObserveProgressRequest>,
    ) -> Result<Response<Self::ObserveProgressStream>, Status> {
        let req = request.into_inner();
        let job_id = docflow_core::JobId::from(parse_uuid("job_id", &req.job_id)?);

        let job = self
            .store
            .find_job_by_id(job_id)
            .await
            .map_err(|err| Status::internal(err.to_string()))?
            .ok_or_else(|| Status::not_found(format!("job {job_id} not found")))?;

        if job.status.is_terminal() {
            let update = job_to_update(&job);
            let stream = futures::stream::once(async move { Ok(update) });
            return Ok(Response::new(Box::pin(stream)));
        }

        let channel = channel_name(job_id);
        let upstream = self
            .bus
            .subscribe(&channel)
            .await
            .map_err(|err| Status::internal(err.to_string()))?;

        // Malformed payload bytes are logged and skipped, not surfaced as a
        // stream error — the subscriber continues (spec §4.1). An upstream
        // bus error terminates the stream, and so does a terminal event:
        // "forwards every event until terminal, then completes" (§4.3.1).
        let stream = futures::stream::unfold((upstream, false), move |(mut upstream, done)| async move {
            if done {
                return None;
            }
            loop {
                match upstream.next().await {
                    None => return None,
                    Some(Ok(payload)) => {
                        match serde_json::from_slice::<docflow_core::ProgressEvent>(&payload) {
                            Ok(event) => {
                                let terminal = event.status.is_terminal();
                                let update = ProgressUpdate {
                                    job_id: event.job_id.to_string(),
                                    status: event.status.as_str().to_string(),
                                    progress: event.progress,
                                    error_message: event.error_message,
                                    updated_at: Some(to_timestamp(event.published_at)),
                                };
                                return Some((Ok(update), (upstream, terminal)));
                            }
                            Err(err) => {
                                tracing::warn!(%err, "dropping malformed progress event");
                                continue;
                            }
                        }
                    }
                    Some(Err(err)) => {
                        let status = Status::internal(format!("event channel error: {err}"));
                        return Some((Err(status), (upstream, true)));
                    }
                }
            }
        });

        Ok(Response::new(Box::pin(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_document_id() {
        let err = parse_uuid("document_id", "").unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn rejects_malformed_uuid() {
        let err = parse_uuid("owner_id", "not-a-uuid").unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }
}
