use crate::error::EventBusError;
use crate::{EventBus, EventStream, MIN_SUBSCRIBER_BUFFER};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Single-process `EventBus` backed by one `tokio::sync::broadcast` channel
/// per channel name, created lazily. Used in production for single-binary
/// deployments and in every test that does not need cross-process delivery.
#[derive(Clone)]
pub struct InMemoryEventBus {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<Vec<u8>>>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn sender_for(&self, channel: &str) -> broadcast::Sender<Vec<u8>> {
        if let Some(tx) = self.channels.read().await.get(channel) {
            return tx.clone();
        }
        let mut channels = self.channels.write().await;
        // Re-check after taking the write lock: another task may have
        // created the channel while we were waiting.
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(MIN_SUBSCRIBER_BUFFER).0)
            .clone()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<u64, EventBusError> {
        let tx = self.sender_for(channel).await;
        // `send` errors only when there are zero receivers, which is not an
        // error condition for a best-effort bus — it just means the
        // message is dropped.
        Ok(tx.send(payload).unwrap_or(0) as u64)
    }

    async fn subscribe(&self, channel: &str) -> Result<EventStream, EventBusError> {
        let rx = self.sender_for(channel).await.subscribe();
        Ok(Box::pin(receiver_stream(rx)))
    }
}

/// Turns a broadcast receiver into the bus's fallible stream, surfacing the
/// first lag as a terminal overflow error rather than silently skipping
/// ahead: on overflow the subscriber gets one `Overflow` error and the
/// stream then ends.
fn receiver_stream(
    rx: broadcast::Receiver<Vec<u8>>,
) -> impl futures::Stream<Item = Result<Vec<u8>, EventBusError>> {
    futures::stream::unfold((rx, false), |(mut rx, done)| async move {
        if done {
            return None;
        }
        match rx.recv().await {
            Ok(payload) => Some((Ok(payload), (rx, false))),
            Err(broadcast::error::RecvError::Lagged(_)) => {
                Some((Err(EventBusError::Overflow), (rx, true)))
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn publish_with_no_subscribers_returns_zero() {
        let bus = InMemoryEventBus::new();
        let count = bus.publish("doc:x:progress", b"hello".to_vec()).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn two_subscribers_each_receive_every_event() {
        let bus = InMemoryEventBus::new();
        let mut a = bus.subscribe("doc:x:progress").await.unwrap();
        let mut b = bus.subscribe("doc:x:progress").await.unwrap();

        let count = bus
            .publish("doc:x:progress", b"one".to_vec())
            .await
            .unwrap();
        assert_eq!(count, 2);

        assert_eq!(a.next().await.unwrap().unwrap(), b"one");
        assert_eq!(b.next().await.unwrap().unwrap(), b"one");
    }

    #[tokio::test]
    async fn slow_subscriber_gets_overflow_and_terminates() {
        let bus = InMemoryEventBus::new();
        let mut slow = bus.subscribe("doc:x:progress").await.unwrap();

        for i in 0..(MIN_SUBSCRIBER_BUFFER + 10) {
            bus.publish("doc:x:progress", format!("{i}").into_bytes())
                .await
                .unwrap();
        }

        let mut saw_overflow = false;
        while let Some(item) = slow.next().await {
            if item.is_err() {
                saw_overflow = true;
                break;
            }
        }
        assert!(saw_overflow);
        assert!(slow.next().await.is_none(), "stream must terminate after overflow");
    }
}
