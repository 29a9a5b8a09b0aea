use chrono::{DateTime, Utc};
use docflow_core::{DocumentStatus, JobStatus};

/// Partial update of a [`docflow_core::ProcessingJob`] applied by
/// `transitionJob`. Fields left `None` are left untouched in the row —
/// the store applies them with `COALESCE($n, column)`.
#[derive(Debug, Default, Clone)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub progress: Option<i32>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_progress(mut self, progress: i32) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    pub fn with_completed_at(mut self, completed_at: DateTime<Utc>) -> Self {
        self.completed_at = Some(completed_at);
        self
    }

    pub fn with_error_message(mut self, error_message: impl Into<String>) -> Self {
        self.error_message = Some(error_message.into());
        self
    }

    pub fn with_result(mut self, result: serde_json::Value) -> Self {
        self.result = Some(result);
        self
    }
}

/// Partial update of a [`docflow_core::Document`] applied by
/// `updateDocument`.
#[derive(Debug, Default, Clone)]
pub struct DocumentPatch {
    pub status: Option<DocumentStatus>,
    pub page_count: Option<i32>,
}

impl DocumentPatch {
    pub fn status(status: DocumentStatus) -> Self {
        Self {
            status: Some(status),
            page_count: None,
        }
    }

    pub fn with_page_count(mut self, page_count: i32) -> Self {
        self.page_count = Some(page_count);
        self
    }
}
