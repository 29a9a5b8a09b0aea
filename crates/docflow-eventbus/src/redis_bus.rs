use crate::error::EventBusError;
use crate::{EventBus, EventStream, MIN_SUBSCRIBER_BUFFER};
use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::{ConnectionManager, PubSub};
use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

/// Cross-process `EventBus` backed by Redis Pub/Sub: a `redis::Client` +
/// `get_async_pubsub` connection for subscribers, a multiplexed
/// `ConnectionManager` for publishers. Holds exactly one subscriber
/// connection for the whole process and fans messages out to any number of
/// local subscribers through an in-process actor, so a single upstream
/// subscription serves N local consumers per channel per process.
#[derive(Clone)]
pub struct RedisEventBus {
    publish_conn: ConnectionManager,
    actor: mpsc::Sender<ActorCommand>,
}

struct ActorCommand {
    channel: String,
    reply: oneshot::Sender<broadcast::Receiver<Vec<u8>>>,
}

impl RedisEventBus {
    pub async fn connect(redis_url: &str) -> Result<Self, EventBusError> {
        let client = redis::Client::open(redis_url)?;
        let publish_conn = ConnectionManager::new(client.clone()).await?;
        let pubsub = client.get_async_pubsub().await?;

        let (actor_tx, actor_rx) = mpsc::channel(64);
        tokio::spawn(run_subscriber_actor(pubsub, actor_rx));

        Ok(Self {
            publish_conn,
            actor: actor_tx,
        })
    }
}

#[async_trait]
impl EventBus for RedisEventBus {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<u64, EventBusError> {
        let mut conn = self.publish_conn.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(receivers.max(0) as u64)
    }

    async fn subscribe(&self, channel: &str) -> Result<EventStream, EventBusError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.actor
            .send(ActorCommand {
                channel: channel.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| EventBusError::Upstream("subscriber actor is gone".into()))?;

        let rx = reply_rx
            .await
            .map_err(|_| EventBusError::Upstream("subscriber actor dropped the reply".into()))?;

        Ok(Box::pin(receiver_stream(rx)))
    }
}

/// Owns the single exclusive Pub/Sub connection for the process. Subscribes
/// to a channel upstream the first time any local consumer asks for it,
/// then fans every message out to a per-channel local broadcast sender.
async fn run_subscriber_actor(mut pubsub: PubSub, mut commands: mpsc::Receiver<ActorCommand>) {
    let mut local: HashMap<String, broadcast::Sender<Vec<u8>>> = HashMap::new();

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                let Some(cmd) = cmd else {
                    debug!("event bus subscriber actor shutting down: no more callers");
                    return;
                };
                let tx = match local.get(&cmd.channel) {
                    Some(tx) => tx.clone(),
                    None => {
                        if let Err(err) = pubsub.subscribe(&cmd.channel).await {
                            warn!(channel = %cmd.channel, %err, "failed to subscribe upstream");
                            continue;
                        }
                        let (tx, _rx) = broadcast::channel(MIN_SUBSCRIBER_BUFFER);
                        local.insert(cmd.channel.clone(), tx.clone());
                        tx
                    }
                };
                let _ = cmd.reply.send(tx.subscribe());
            }
            msg = pubsub.on_message().next() => {
                let Some(msg) = msg else {
                    warn!("redis pub/sub connection closed");
                    return;
                };
                let channel: String = msg.get_channel_name().to_string();
                let payload: Vec<u8> = msg.get_payload_bytes().to_vec();
                if let Some(tx) = local.get(&channel) {
                    // Best-effort: zero receivers is not an error.
                    let _ = tx.send(payload);
                }
            }
        }
    }
}

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
