//! C3: the worker pipeline. Exposes the `WorkerService` gRPC surface
//! (`StartProcessing`, `ObserveProgress`) and the background execution
//! engine that drives one page-by-page processing loop per accepted job.

pub mod config;
pub mod engine;
pub mod grpc;

pub use config::WorkerConfig;
pub use grpc::WorkerServiceImpl;
