use clap::Parser;

/// Binary configuration for the worker process, following the teacher's
/// `clap::Parser` + `env` derive pattern for service configuration.
#[derive(Debug, Clone, Parser)]
pub struct WorkerConfig {
    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Redis connection string for the cross-process event bus. When unset
    /// the worker falls back to an in-memory bus, suitable only for a
    /// single-binary deployment (e.g. tests, local dev with no separate web
    /// process).
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Address the gRPC server binds to.
    #[arg(long, env = "WORKER_GRPC_ADDR", default_value = "0.0.0.0:50061")]
    pub grpc_addr: String,

    /// Maximum number of pooled Postgres connections.
    #[arg(long, env = "WORKER_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,
}
