/// The abstract error kinds shared by every crate in the
/// workspace so that HTTP handlers and the gRPC service map a single enum
/// onto their respective wire representations instead of each inventing
/// their own.
#[derive(Debug, thiserror::Error)]
pub enum DocflowError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not owned by caller: {0}")]
    Ownership(String),

    #[error("object storage failed: {0}")]
    UpstreamStorage(String),

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DocflowError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
