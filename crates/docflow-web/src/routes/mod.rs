pub mod collab;
pub mod health;
pub mod progress;
pub mod upload;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/documents/upload", post(upload::upload_document))
        .route("/documents/:job_id/progress", get(progress::stream_progress))
        .route("/collab", get(collab::collab_ws))
        .route("/health", get(health::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
