use crate::ids::{DocumentId, JobId};
use crate::model::JobStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The wire shape published on the event channel. Never persisted
/// — the durable store is authoritative, this is the ephemeral, best-effort
/// companion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub document_id: DocumentId,
    pub status: JobStatus,
    pub progress: i32,
    pub message: String,
    pub current_page: i32,
    pub total_pages: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// Deterministic channel key for a job's progress events, stable across
/// producer/consumer restarts.
pub fn channel_name(job_id: JobId) -> String {
    format!("doc:{job_id}:progress")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_name_is_deterministic() {
        let job_id = JobId::new();
        assert_eq!(channel_name(job_id), channel_name(job_id));
        assert!(channel_name(job_id).starts_with("doc:"));
        assert!(channel_name(job_id).ends_with(":progress"));
    }
}
