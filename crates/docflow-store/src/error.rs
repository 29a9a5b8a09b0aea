use docflow_core::DocflowError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document or job not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for DocflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => DocflowError::NotFound(msg),
            StoreError::Database(err) => DocflowError::Persistence(err.to_string()),
        }
    }
}
