//! Upgrade entrypoint for the room-scoped collaboration bus (§4.5.3). The
//! actual per-connection protocol loop lives in `crate::collab`.

use crate::state::AppState;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::Response;

pub async fn collab_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| crate::collab::handle_socket(socket, state.bus, state.rooms))
}
