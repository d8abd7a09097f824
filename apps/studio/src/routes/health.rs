use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and session id.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let session = state.session.lock().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "studio",
        "session": session.id,
        "startedAt": session.started_at,
    }))
}
