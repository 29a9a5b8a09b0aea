//! Transactional Postgres persistence for Documents and ProcessingJobs. One
//! service struct wraps a `PgPool`: plain methods returning
//! `sqlx::query!`/`query_as!` results, errors mapped to
//! `docflow_core::DocflowError` at the edge.

mod document_store;
mod error;
mod patch;
mod row;

pub use document_store::DocumentStore;
pub use error::StoreError;
pub use patch::{DocumentPatch, JobPatch};
