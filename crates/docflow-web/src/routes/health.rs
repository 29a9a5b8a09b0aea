//! `GET /health`: 200 when the database is reachable within the budget.

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use std::time::Duration;

const HEALTH_CHECK_BUDGET: Duration = Duration::from_secs(3);

pub async fn health(State(state): State<AppState>) -> StatusCode {
    let check = sqlx::query("SELECT 1").execute(state.store.pool());
    match tokio::time::timeout(HEALTH_CHECK_BUDGET, check).await {
        Ok(Ok(_)) => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}
