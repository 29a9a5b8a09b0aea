use crate::error::StoreError;
use chrono::{DateTime, Utc};
use docflow_core::{Document, DocumentId, DocumentStatus, JobId, JobStatus, OwnerId, ProcessingJob};
use uuid::Uuid;

/// Raw row shape returned by `sqlx::query_as!` against `docflow.documents`.
/// Status is stored as `text`; converting it into `DocumentStatus` happens
/// at the store boundary so the rest of the crate never sees a bare string.
pub(crate) struct DocumentRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub storage_key: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub status: String,
    pub page_count: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRow {
    pub(crate) fn into_domain(self) -> Result<Document, StoreError> {
        let status = self
            .status
            .parse::<DocumentStatus>()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;
        Ok(Document {
            id: DocumentId::from(self.id),
            owner_id: OwnerId::from(self.owner_id),
            title: self.title,
            storage_key: self.storage_key,
            mime_type: self.mime_type,
            size_bytes: self.size_bytes,
            status,
            page_count: self.page_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub(crate) struct JobRow {
    pub id: Uuid,
    pub document_id: Uuid,
    pub status: String,
    pub progress: i32,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRow {
    pub(crate) fn into_domain(self) -> Result<ProcessingJob, StoreError> {
        let status = self
            .status
            .parse::<JobStatus>()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;
        Ok(ProcessingJob {
            id: JobId::from(self.id),
            document_id: DocumentId::from(self.document_id),
            status,
            progress: self.progress,
            result: self.result,
            error_message: self.error_message,
            started_at: self.started_at,
            completed_at: self.completed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
