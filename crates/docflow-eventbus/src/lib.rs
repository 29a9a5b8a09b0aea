//! The ephemeral, best-effort named-channel pub/sub bus.
//!
//! `EventBus` is the stable interface; two implementations back it, one for
//! in-process tests and one for cross-process production use:
//! [`InMemoryEventBus`] (a `tokio::sync::broadcast` map) and [`RedisEventBus`]
//! (a dedicated subscriber actor plus a shared publish connection).

mod error;
mod in_memory;
mod redis_bus;

pub use error::EventBusError;
pub use in_memory::InMemoryEventBus;
pub use redis_bus::RedisEventBus;

use async_trait::async_trait;
use futures::stream::BoxStream;

/// Minimum per-subscriber buffer depth before the bus must surface an
/// overflow error to that subscriber and terminate its stream.
pub const MIN_SUBSCRIBER_BUFFER: usize = 64;

/// A finite-or-infinite sequence of channel payloads. Terminated by explicit
/// unsubscribe (dropping the stream), by an overflow error, or by an
/// upstream error — never silently.
pub type EventStream = BoxStream<'static, Result<Vec<u8>, EventBusError>>;

/// Ephemeral, at-most-once, per-publisher-ordered pub/sub over named string
/// channels. No persistence, no replay, no consumer groups.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publishes `payload` to every subscriber currently attached to
    /// `channel`. Returns the number of attached subscribers at dispatch
    /// time. If nobody is attached, the message is dropped and this returns
    /// `0` — that is not an error.
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<u64, EventBusError>;

    /// Subscribes to `channel`. The returned stream yields every message
    /// published after this call returns, until the stream is dropped or an
    /// overflow/upstream error terminates it.
    async fn subscribe(&self, channel: &str) -> Result<EventStream, EventBusError>;
}
