use crate::collab::RoomRegistry;
use crate::object_store::ObjectStore;
use docflow_eventbus::EventBus;
use docflow_proto::v1::worker_service_client::WorkerServiceClient;
use docflow_store::DocumentStore;
use std::sync::Arc;
use tonic::transport::Channel;

/// Shared application state for the ingest + progress-bridge server,
/// mirroring the teacher's `AppState` shape (`ob-poc-web::state::AppState`):
/// one `Clone`-able struct of `Arc`-wrapped collaborators injected at
/// startup, no global mutable state.
#[derive(Clone)]
pub struct AppState {
    pub store: DocumentStore,
    pub bus: Arc<dyn EventBus>,
    pub worker_client: WorkerServiceClient<Channel>,
    pub object_store: Arc<dyn ObjectStore>,
    pub rooms: RoomRegistry,
}
