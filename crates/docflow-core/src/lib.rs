//! Shared domain types for the docflow processing pipeline.
//!
//! This crate has no I/O. It defines the entities of the data model
//! (`Document`, `ProcessingJob`, `ProgressEvent`), the status enums that
//! drive their lifecycles, and the error kinds that every other crate in the
//! workspace maps its own errors onto at the boundary.

mod error;
mod ids;
mod model;
mod progress;
pub mod tuning;

pub use error::DocflowError;
pub use ids::{DocumentId, JobId, OwnerId};
pub use model::{Document, DocumentStatus, JobStatus, ProcessingJob};
pub use progress::{channel_name, ProgressEvent};
