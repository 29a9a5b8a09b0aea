use clap::Parser;

/// Binary configuration for the ingest + progress-bridge web process,
/// following the teacher's `clap::Parser` + `env` derive pattern.
#[derive(Debug, Clone, Parser)]
pub struct WebConfig {
    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Redis connection string for the cross-process event bus. When unset
    /// the bridge falls back to an in-memory bus.
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// gRPC address of the worker process this orchestrator dispatches to.
    #[arg(long, env = "WORKER_GRPC_ADDR", default_value = "http://127.0.0.1:50061")]
    pub worker_grpc_addr: String,

    /// Address this HTTP server binds to.
    #[arg(long, env = "WEB_HTTP_ADDR", default_value = "0.0.0.0:8080")]
    pub http_addr: String,

    /// Local directory the filesystem object-store stub writes uploads
    /// under. A real deployment points `ObjectStore` at S3/GCS instead.
    #[arg(long, env = "OBJECT_STORE_DIR", default_value = "./data/uploads")]
    pub object_store_dir: String,

    /// Maximum number of pooled Postgres connections.
    #[arg(long, env = "WEB_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,
}
