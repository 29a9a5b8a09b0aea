//! The ingest orchestrator (C4) and progress stream bridge (C5), one Axum
//! binary, mirroring the teacher's `ob-poc-web` crate layout (`main.rs` +
//! `state.rs` + `routes/*`).

mod collab;
mod config;
mod error;
mod object_store;
mod routes;
mod state;

use clap::Parser;
use config::WebConfig;
use docflow_eventbus::{EventBus, InMemoryEventBus, RedisEventBus};
use docflow_proto::v1::worker_service_client::WorkerServiceClient;
use docflow_store::DocumentStore;
use object_store::LocalObjectStore;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::sync::Arc;
use tonic::transport::Channel;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docflow_web=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WebConfig::parse();

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    tracing::info!("connected to database");

    let bus: Arc<dyn EventBus> = match &config.redis_url {
        Some(redis_url) => {
            let bus = RedisEventBus::connect(redis_url).await?;
            tracing::info!("connected to redis event bus");
            Arc::new(bus)
        }
        None => {
            tracing::warn!("REDIS_URL not set, falling back to in-memory event bus");
            Arc::new(InMemoryEventBus::new())
        }
    };

    // Lazy channel: the worker being unreachable at startup (or at any later
    // point) must never stop this service from accepting uploads — the
    // bounded dispatch in `routes::upload` is what tolerates that (spec
    // §4.4), not the channel construction.
    let worker_channel = Channel::from_shared(config.worker_grpc_addr.clone())?.connect_lazy();
    let worker_client = WorkerServiceClient::new(worker_channel);
    tracing::info!(addr = %config.worker_grpc_addr, "worker gRPC client ready (lazy connect)");

    let object_store = Arc::new(LocalObjectStore::new(config.object_store_dir.clone()));

    let state = AppState {
        store: DocumentStore::new(pool),
        bus,
        worker_client,
        object_store,
        rooms: collab::RoomRegistry::new(),
    };

    let app = routes::router(state);

    let addr: std::net::SocketAddr = config.http_addr.parse()?;
    tracing::info!(%addr, "ingest + progress bridge listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
