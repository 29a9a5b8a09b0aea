//! The background execution engine (§4.3.2): one task per accepted job,
//! independent of every other task, touching only the store and the event
//! bus. A crashed task must never stall or panic the process — `spawn_job`
//! supervises the `tokio::spawn`ed future and just logs a `JoinError`.

use chrono::Utc;
use docflow_core::tuning::{PAGE_DELAY, SIMULATED_PAGE_COUNT};
use docflow_core::{channel_name, DocumentId, DocumentStatus, JobId, JobStatus, ProgressEvent};
use docflow_eventbus::EventBus;
use docflow_store::{DocumentPatch, DocumentStore, JobPatch};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Spawns the per-job execution task and returns immediately. Supervises
/// the join handle so a panic inside `run_job` is logged rather than
/// propagated — "a crashed task must never stall or panic the process."
pub fn spawn_job(
    store: DocumentStore,
    bus: Arc<dyn EventBus>,
    document_id: DocumentId,
    job_id: JobId,
) {
    tokio::spawn(async move {
        if let Err(join_err) = tokio::spawn(run_job(store, bus, document_id, job_id)).await {
            error!(%job_id, error = %join_err, "processing task panicked");
        }
    });
}

/// The per-task procedure of spec §4.3.2, run to completion for one job.
/// Every step persists to the durable store *before* publishing the
/// corresponding event, so a late subscriber can always re-read the store
/// and reconcile.
async fn run_job(store: DocumentStore, bus: Arc<dyn EventBus>, document_id: DocumentId, job_id: JobId) {
    if let Err(err) = run_job_inner(&store, bus.as_ref(), document_id, job_id).await {
        fail_job(&store, bus.as_ref(), document_id, job_id, &err.to_string()).await;
    }
}

async fn run_job_inner(
    store: &DocumentStore,
    bus: &dyn EventBus,
    document_id: DocumentId,
    job_id: JobId,
) -> Result<(), docflow_store::StoreError> {
    let total_pages = SIMULATED_PAGE_COUNT;
    let started_at = Utc::now();

    store
        .transition_job(
            job_id,
            JobPatch::status(JobStatus::Running)
                .with_started_at(started_at)
                .with_progress(0),
        )
        .await?;

    publish(
        bus,
        job_id,
        ProgressEvent {
            job_id,
            document_id,
            status: JobStatus::Running,
            progress: 0,
            message: format!("Processing started — {total_pages} pages queued"),
            current_page: 0,
            total_pages,
            error_message: None,
            published_at: Utc::now(),
        },
    )
    .await;

    for page in 1..=total_pages {
        tokio::time::sleep(PAGE_DELAY).await;

        // round(page * 95 / total_pages): integer division floors, so the
        // rounding is folded into the numerator/denominator (half-up) rather
        // than dropped. 100 is reserved for the Completed step, so cap at 95.
        let progress = ((page * 95 * 2 + total_pages) / (total_pages * 2)).min(95);

        store
            .transition_job(job_id, JobPatch::default().with_progress(progress))
            .await?;

        publish(
            bus,
            job_id,
            ProgressEvent {
                job_id,
                document_id,
                status: JobStatus::Running,
                progress,
                message: format!("Processing page {page} of {total_pages}"),
                current_page: page,
                total_pages,
                error_message: None,
                published_at: Utc::now(),
            },
        )
        .await;
    }

    let completed_at = Utc::now();
    store
        .transition_job(
            job_id,
            JobPatch::status(JobStatus::Completed)
                .with_progress(100)
                .with_completed_at(completed_at),
        )
        .await?;
    store
        .update_document(
            document_id,
            DocumentPatch::status(DocumentStatus::Completed).with_page_count(total_pages),
        )
        .await?;

    publish(
        bus,
        job_id,
        ProgressEvent {
            job_id,
            document_id,
            status: JobStatus::Completed,
            progress: 100,
            message: format!("Processing complete — {total_pages} pages extracted"),
            current_page: total_pages,
            total_pages,
            error_message: None,
            published_at: Utc::now(),
        },
    )
    .await;

    info!(%job_id, %document_id, "job completed");
    Ok(())
}

/// Failure path of §4.3.2: persist Failed first (double-logging if that
/// itself fails), then make a best-effort attempt to publish — a publish
/// failure here is swallowed, the store is already authoritative.
async fn fail_job(
    store: &DocumentStore,
    bus: &dyn EventBus,
    document_id: DocumentId,
    job_id: JobId,
    error_message: &str,
) {
    warn!(%job_id, %document_id, %error_message, "job failed");

    let persisted = store
        .transition_job(
            job_id,
            JobPatch::status(JobStatus::Failed)
                .with_error_message(error_message)
                .with_completed_at(Utc::now()),
        )
        .await;

    if let Err(err) = persisted {
        error!(%job_id, %err, "failed to persist Failed status after job failure");
    }

    if let Err(err) = store
        .update_document(document_id, DocumentPatch::status(DocumentStatus::Failed))
        .await
    {
        error!(%job_id, %err, "failed to mark document Failed after job failure");
    }

    publish(
        bus,
        job_id,
        ProgressEvent {
            job_id,
            document_id,
            status: JobStatus::Failed,
            progress: 0,
            message: "Processing failed".to_string(),
            current_page: 0,
            total_pages: 0,
            error_message: Some(error_message.to_string()),
            published_at: Utc::now(),
        },
    )
    .await;
}

async fn publish(bus: &dyn EventBus, job_id: JobId, event: ProgressEvent) {
    let payload = match serde_json::to_vec(&event) {
        Ok(payload) => payload,
        Err(err) => {
            error!(%job_id, %err, "failed to serialize progress event");
            return;
        }
    };
    if let Err(err) = bus.publish(&channel_name(job_id), payload).await {
        warn!(%job_id, %err, "failed to publish progress event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_eventbus::InMemoryEventBus;
    use futures::StreamExt;

    // `run_job_inner`/`fail_job` need a live Postgres pool via `DocumentStore`,
    // so the end-to-end pipeline is exercised in `docflow-web`'s integration
    // tests against `InMemoryEventBus` + a test database. Here we check the
    // piece that has no database dependency: progress monotonicity and the
    // reserved-100 invariant of the page loop's arithmetic.
    #[test]
    fn progress_formula_is_monotonic_and_caps_at_95() {
        let total_pages = SIMULATED_PAGE_COUNT;
        let mut last = -1;
        for page in 1..=total_pages {
            let progress = ((page * 95 * 2 + total_pages) / (total_pages * 2)).min(95);
            assert!(progress >= last);
            assert!((0..=95).contains(&progress));
            last = progress;
        }
    }

    #[test]
    fn progress_formula_matches_spec_s1_sequence() {
        // spec §8 scenario S1's literal sequence for a 12-page document.
        const EXPECTED: [i32; 12] = [8, 16, 24, 32, 40, 48, 55, 63, 71, 79, 87, 95];
        let total_pages = SIMULATED_PAGE_COUNT;
        let actual: Vec<i32> = (1..=total_pages)
            .map(|page| ((page * 95 * 2 + total_pages) / (total_pages * 2)).min(95))
            .collect();
        assert_eq!(actual, EXPECTED);
    }

    #[tokio::test]
    async fn publish_failure_is_swallowed_not_propagated() {
        // No subscriber attached: publish on InMemoryEventBus still succeeds
        // (returns 0 receivers), matching "no subscriber attached -> dropped,
        // not an error."
        let bus = InMemoryEventBus::new();
        let job_id = JobId::new();
        let document_id = DocumentId::new();
        publish(
            &bus,
            job_id,
            ProgressEvent {
                job_id,
                document_id,
                status: JobStatus::Running,
                progress: 10,
                message: "x".into(),
                current_page: 1,
                total_pages: 12,
                error_message: None,
                published_at: Utc::now(),
            },
        )
        .await;

        // A subscriber that attaches afterwards must not see the dropped event.
        let mut sub = bus.subscribe(&channel_name(job_id)).await.unwrap();
        bus.publish(&channel_name(job_id), b"after".to_vec())
            .await
            .unwrap();
        assert_eq!(sub.next().await.unwrap().unwrap(), b"after");
    }
}
