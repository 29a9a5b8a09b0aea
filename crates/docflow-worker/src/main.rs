//! Worker binary: serves the `WorkerService` gRPC contract and owns the
//! background execution engine (C3).

use clap::Parser;
use docflow_eventbus::{EventBus, InMemoryEventBus, RedisEventBus};
use docflow_proto::v1::worker_service_server::WorkerServiceServer;
use docflow_store::DocumentStore;
use docflow_worker::{WorkerConfig, WorkerServiceImpl};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docflow_worker=info,tonic=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::parse();

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

    let store = DocumentStore::new(pool);
    let service = WorkerServiceImpl::new(store, bus);

    let addr = config.grpc_addr.parse()?;
    tracing::info!(%addr, "worker gRPC server listening");

    tonic::transport::Server::builder()
        .add_service(WorkerServiceServer::new(service))
        .serve(addr)
        .await?;

    Ok(())
}
