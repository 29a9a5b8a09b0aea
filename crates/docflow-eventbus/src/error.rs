#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("subscriber buffer overflowed")]
    Overflow,

    #[error("upstream pub/sub error: {0}")]
    Upstream(String),
}

impl From<redis::RedisError> for EventBusError {
    fn from(err: redis::RedisError) -> Self {
        EventBusError::Upstream(err.to_string())
    }
}
