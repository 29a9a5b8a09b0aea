use crate::ids::{DocumentId, JobId, OwnerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Failed)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = crate::DocflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(Self::Uploaded),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(crate::DocflowError::Internal(format!(
                "unknown document status: {other}"
            ))),
        }
    }
}

/// Lifecycle status of a [`ProcessingJob`]. Trajectory is
/// `Pending -> Running -> {Completed | Failed}`; `Completed`/`Failed` are
/// terminal — once entered, no further transition is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = crate::DocflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(crate::DocflowError::Internal(format!(
                "unknown job status: {other}"
            ))),
        }
    }
}

/// An uploaded artifact. Belongs to exactly one owner; deletion
/// cascades to its jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub owner_id: OwnerId,
    pub title: String,
    pub storage_key: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub status: DocumentStatus,
    pub page_count: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single processing attempt on a [`Document`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingJob {
    pub id: JobId,
    pub document_id: DocumentId,
    pub status: JobStatus,
    pub progress: i32,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessingJob {
    /// Checks the invariants that hold for any row observed in
    /// isolation (as opposed to the monotonic-progress invariant, which is a
    /// property of a sequence of rows and is checked by the store/tests).
    pub fn check_invariants(&self) -> Result<(), crate::DocflowError> {
        if !(0..=100).contains(&self.progress) {
            return Err(crate::DocflowError::Internal(format!(
                "progress {} out of range",
                self.progress
            )));
        }
        let completed_at_set = self.completed_at.is_some();
        if completed_at_set != self.status.is_terminal() {
            return Err(crate::DocflowError::Internal(
                "completed_at must be set iff status is terminal".into(),
            ));
        }
        if self.result.is_some() && self.status != JobStatus::Completed {
            return Err(crate::DocflowError::Internal(
                "result set implies status Completed".into(),
            ));
        }
        if self.error_message.is_some() && self.status != JobStatus::Failed {
            return Err(crate::DocflowError::Internal(
                "error_message set implies status Failed".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_job() -> ProcessingJob {
        ProcessingJob {
            id: JobId::new(),
            document_id: DocumentId::new(),
            status: JobStatus::Pending,
            progress: 0,
            result: None,
            error_message: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn pending_job_passes_invariants() {
        assert!(base_job().check_invariants().is_ok());
    }

    #[test]
    fn completed_without_completed_at_is_rejected() {
        let mut job = base_job();
        job.status = JobStatus::Completed;
        job.progress = 100;
        assert!(job.check_invariants().is_err());
    }

    #[test]
    fn out_of_range_progress_is_rejected() {
        let mut job = base_job();
        job.progress = 150;
        assert!(job.check_invariants().is_err());
    }
}
