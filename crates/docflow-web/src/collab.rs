//! The room-scoped collaboration bus (§4.5.3): cursors and annotations
//! fanned out to every socket joined to a document's room, across bridge
//! instances, via the same `EventBus` used for progress events. Room
//! membership itself stays process-local bookkeeping; delivery always goes
//! through the bus so a publish from any instance reaches every joined
//! socket regardless of which instance it connected to.
//!
//! Each connection is one reader loop plus, while joined to a room, one
//! spawned forwarder task reading the bus subscription and pushing frames
//! through an mpsc channel to a dedicated writer task — the same
//! read-loop/event-channel split `alfredjeanlab-oddjobs`'s websocket bridge
//! uses on the client side, adapted here to the server side.

use axum::extract::ws::{Message, WebSocket};
use docflow_core::DocumentId;
use docflow_eventbus::EventBus;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

pub type ClientId = Uuid;

pub fn room_channel(document_id: DocumentId) -> String {
    format!("room:{document_id}")
}

/// Process-local membership set, keyed by room. Mutations are serialized
/// per-process by the single `RwLock` (spec §5 "membership mutations are
/// serialized per room" — a single lock over the whole map is a stronger,
/// still-correct version of that guarantee).
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<DocumentId, HashSet<ClientId>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn join(&self, document_id: DocumentId, client_id: ClientId) {
        self.rooms
            .write()
            .await
            .entry(document_id)
            .or_default()
            .insert(client_id);
    }

    async fn leave(&self, document_id: DocumentId, client_id: ClientId) {
        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(&document_id) {
            members.remove(&client_id);
            if members.is_empty() {
                rooms.remove(&document_id);
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum ClientMessage {
    JoinDocument { document_id: DocumentId },
    CursorMove { document_id: DocumentId, x: f64, y: f64 },
    AddAnnotation { document_id: DocumentId, content: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum RoomEvent {
    CursorChanged { client_id: ClientId, x: f64, y: f64 },
    AnnotationAdded { client_id: ClientId, document_id: DocumentId, content: String },
}

impl RoomEvent {
    fn origin(&self) -> ClientId {
        match self {
            RoomEvent::CursorChanged { client_id, .. } => *client_id,
            RoomEvent::AnnotationAdded { client_id, .. } => *client_id,
        }
    }
}

/// Drives one collaboration websocket connection end-to-end: reads
/// `join-document`/`cursor-move`/`add-annotation` frames from the client,
/// and forwards every non-self `RoomEvent` published to the currently
/// joined room back down the socket.
pub async fn handle_socket(socket: WebSocket, bus: Arc<dyn EventBus>, rooms: RoomRegistry) {
    let client_id = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut current_room: Option<DocumentId> = None;
    let mut forwarder: Option<JoinHandle<()>> = None;

    while let Some(Ok(msg)) = stream.next().await {
        let Message::Text(text) = msg else { continue };
        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::JoinDocument { document_id }) => {
                if let Some(handle) = forwarder.take() {
                    handle.abort();
                }
                if let Some(old_doc) = current_room.take() {
                    rooms.leave(old_doc, client_id).await;
                }
                rooms.join(document_id, client_id).await;
                match bus.subscribe(&room_channel(document_id)).await {
                    Ok(mut sub) => {
                        let forward_tx = out_tx.clone();
                        forwarder = Some(tokio::spawn(async move {
                            while let Some(item) = sub.next().await {
                                match item {
                                    Ok(payload) => {
                                        let Ok(event) = serde_json::from_slice::<RoomEvent>(&payload) else {
                                            continue;
                                        };
                                        if event.origin() == client_id {
                                            continue;
                                        }
                                        let json = serde_json::to_string(&event).unwrap_or_default();
                                        if forward_tx.send(Message::Text(json)).is_err() {
                                            break;
                                        }
                                    }
                                    Err(err) => {
                                        warn!(%err, "collaboration room subscription error");
                                        break;
                                    }
                                }
                            }
                        }));
                        current_room = Some(document_id);
                    }
                    Err(err) => warn!(%err, "failed to subscribe to collaboration room"),
                }
            }
            Ok(ClientMessage::CursorMove { document_id, x, y }) => {
                publish_event(bus.as_ref(), document_id, RoomEvent::CursorChanged { client_id, x, y }).await;
            }
            Ok(ClientMessage::AddAnnotation { document_id, content }) => {
                publish_event(
                    bus.as_ref(),
                    document_id,
                    RoomEvent::AnnotationAdded { client_id, document_id, content },
                )
                .await;
            }
            Err(err) => debug!(%err, "ignoring malformed collaboration frame"),
        }
    }

    if let Some(handle) = forwarder {
        handle.abort();
    }
    if let Some(doc) = current_room {
        rooms.leave(doc, client_id).await;
    }
    writer.abort();
}

async fn publish_event(bus: &dyn EventBus, document_id: DocumentId, event: RoomEvent) {
    let Ok(payload) = serde_json::to_vec(&event) else {
        return;
    };
    if let Err(err) = bus.publish(&room_channel(document_id), payload).await {
        warn!(%err, "failed to publish collaboration event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_channel_is_namespaced_by_document() {
        let doc = DocumentId::new();
        assert_eq!(room_channel(doc), format!("room:{doc}"));
    }

    #[test]
    fn room_event_serializes_with_kebab_case_tag() {
        let event = RoomEvent::CursorChanged {
            client_id: Uuid::new_v4(),
            x: 1.0,
            y: 2.0,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"cursor-changed\""));
    }

    #[tokio::test]
    async fn registry_drops_empty_rooms_on_last_leave() {
        let registry = RoomRegistry::new();
        let doc = DocumentId::new();
        let client = Uuid::new_v4();
        registry.join(doc, client).await;
        assert!(registry.rooms.read().await.contains_key(&doc));
        registry.leave(doc, client).await;
        assert!(!registry.rooms.read().await.contains_key(&doc));
    }

    #[tokio::test]
    async fn cursor_move_does_not_echo_to_its_own_origin() {
        // The forwarder task filters by `RoomEvent::origin()`; exercise that
        // predicate directly since a full websocket round trip needs a live
        // upgrade handshake.
        let client_id = Uuid::new_v4();
        let event = RoomEvent::CursorChanged { client_id, x: 1.0, y: 2.0 };
        assert_eq!(event.origin(), client_id);
    }
}
