use crate::error::StoreError;
use crate::patch::{DocumentPatch, JobPatch};
use crate::row::{DocumentRow, JobRow};
use docflow_core::{DocumentId, JobId, JobStatus, OwnerId, ProcessingJob};
use sqlx::PgPool;
use tracing::instrument;

/// Transactional persistence for Documents and ProcessingJobs. Wraps a
/// `PgPool` the way a typical sqlx-backed repository service does.
#[derive(Clone)]
pub struct DocumentStore {
    pool: PgPool,
}

impl DocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Exposes the underlying pool for callers that need a raw connection
    /// outside the repository methods above — currently only the `/health`
    /// endpoint's liveness probe.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates a Document (status `uploaded`) and its first ProcessingJob
    /// (status `pending`, progress 0) in one transaction. On any failure no
    /// rows are left behind.
    #[instrument(skip(self))]
    pub async fn create_document_and_job(
        &self,
        owner_id: OwnerId,
        title: &str,
        storage_key: &str,
        mime_type: &str,
        size_bytes: i64,
    ) -> Result<(DocumentId, JobId), StoreError> {
        let mut tx = self.pool.begin().await?;

        let document_id = sqlx::query!(
            r#"
            INSERT INTO docflow.documents (owner_id, title, storage_key, mime_type, size_bytes, status)
            VALUES ($1, $2, $3, $4, $5, 'uploaded')
            RETURNING id
            "#,
            owner_id.as_uuid(),
            title,
            storage_key,
            mime_type,
            size_bytes,
        )
        .fetch_one(&mut *tx)
        .await?
        .id;

        let job_id = sqlx::query!(
            r#"
            INSERT INTO docflow.processing_jobs (document_id, status, progress)
            VALUES ($1, 'pending', 0)
            RETURNING id
            "#,
            document_id,
        )
        .fetch_one(&mut *tx)
        .await?
        .id;

        tx.commit().await?;

        Ok((DocumentId::from(document_id), JobId::from(job_id)))
    }

    #[instrument(skip(self))]
    pub async fn find_job_by_id(&self, job_id: JobId) -> Result<Option<ProcessingJob>, StoreError> {
        let row = sqlx::query_as!(
            JobRow,
            r#"
            SELECT id, document_id, status, progress, result, error_message,
                   started_at, completed_at, created_at, updated_at
            FROM docflow.processing_jobs
            WHERE id = $1
            "#,
            job_id.as_uuid(),
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRow::into_domain).transpose()
    }

    #[instrument(skip(self))]
    pub async fn find_document(
        &self,
        document_id: DocumentId,
        owner_id: Option<OwnerId>,
    ) -> Result<Option<docflow_core::Document>, StoreError> {
        let row = sqlx::query_as!(
            DocumentRow,
            r#"
            SELECT id, owner_id, title, storage_key, mime_type, size_bytes,
                   status, page_count, created_at, updated_at
            FROM docflow.documents
            WHERE id = $1 AND ($2::uuid IS NULL OR owner_id = $2)
            "#,
            document_id.as_uuid(),
            owner_id.map(|o| o.as_uuid()),
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(DocumentRow::into_domain).transpose()
    }

    /// Used to guard the "at most one Running job per Document" invariant.
    /// Enforced at the application layer: the caller reads this, then
    /// creates a Running job, accepting that a race may briefly produce two.
    #[instrument(skip(self))]
    pub async fn find_running_job_for_document(
        &self,
        document_id: DocumentId,
    ) -> Result<Option<ProcessingJob>, StoreError> {
        let row = sqlx::query_as!(
            JobRow,
            r#"
            SELECT id, document_id, status, progress, result, error_message,
                   started_at, completed_at, created_at, updated_at
            FROM docflow.processing_jobs
            WHERE document_id = $1 AND status = 'running'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            document_id.as_uuid(),
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRow::into_domain).transpose()
    }

    /// Finds the most recently created Pending job for a document, if any.
    /// Not one of the spec's named C2 operations; added so the worker's
    /// `StartProcessing` can take over the job ingestion already created
    /// instead of minting a duplicate row for the same attempt.
    #[instrument(skip(self))]
    pub async fn find_pending_job_for_document(
        &self,
        document_id: DocumentId,
    ) -> Result<Option<ProcessingJob>, StoreError> {
        let row = sqlx::query_as!(
            JobRow,
            r#"
            SELECT id, document_id, status, progress, result, error_message,
                   started_at, completed_at, created_at, updated_at
            FROM docflow.processing_jobs
            WHERE document_id = $1 AND status = 'pending'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            document_id.as_uuid(),
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRow::into_domain).transpose()
    }

    /// Creates a fresh Pending job for a document that already exists.
    /// Added alongside `find_pending_job_for_document` for the same reason:
    /// the worker needs a job row to drive even when ingestion's original
    /// job has already moved past Pending (e.g. a future reconciler
    /// re-driving a document).
    #[instrument(skip(self))]
    pub async fn create_job_for_document(&self, document_id: DocumentId) -> Result<JobId, StoreError> {
        let job_id = sqlx::query!(
            r#"
            INSERT INTO docflow.processing_jobs (document_id, status, progress)
            VALUES ($1, 'pending', 0)
            RETURNING id
            "#,
            document_id.as_uuid(),
        )
        .fetch_one(&self.pool)
        .await?
        .id;

        Ok(JobId::from(job_id))
    }

    #[instrument(skip(self, patch))]
    pub async fn transition_job(&self, job_id: JobId, patch: JobPatch) -> Result<(), StoreError> {
        let status_str = patch.status.as_ref().map(JobStatus::as_str);
        let result = sqlx::query!(
            r#"
            UPDATE docflow.processing_jobs
            SET status = COALESCE($2, status),
                progress = COALESCE($3, progress),
                error_message = COALESCE($4, error_message),
                started_at = COALESCE($5, started_at),
                completed_at = COALESCE($6, completed_at),
                result = COALESCE($7, result),
                updated_at = now()
            WHERE id = $1
            "#,
            job_id.as_uuid(),
            status_str,
            patch.progress,
            patch.error_message,
            patch.started_at,
            patch.completed_at,
            patch.result,
        )
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("job {job_id}")));
        }
        Ok(())
    }

    #[instrument(skip(self, patch))]
    pub async fn update_document(
        &self,
        document_id: DocumentId,
        patch: DocumentPatch,
    ) -> Result<(), StoreError> {
        let status_str = patch.status.as_ref().map(|s| s.as_str());
        let result = sqlx::query!(
            r#"
            UPDATE docflow.documents
            SET status = COALESCE($2, status),
                page_count = COALESCE($3, page_count),
                updated_at = now()
            WHERE id = $1
            "#,
            document_id.as_uuid(),
            status_str,
            patch.page_count,
        )
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("document {document_id}")));
        }
        Ok(())
    }

    /// Deletes a Document (and, via `ON DELETE CASCADE`, its Jobs and any
    /// annotations).
    #[instrument(skip(self))]
    pub async fn delete_document(
        &self,
        document_id: DocumentId,
        owner_id: OwnerId,
    ) -> Result<(), StoreError> {
        let result = sqlx::query!(
            r#"
            DELETE FROM docflow.documents
            WHERE id = $1 AND owner_id = $2
            "#,
            document_id.as_uuid(),
            owner_id.as_uuid(),
        )
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("document {document_id}")));
        }
        Ok(())
    }
}
