use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{dispatch, Dispatch, Envelope};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum BridgeResponse {
    PromptOpened,
    Patched { path: String },
    Ignored { reason: String },
    Dropped { reason: String },
}

impl From<Dispatch> for BridgeResponse {
    fn from(result: Dispatch) -> Self {
        match result {
            Dispatch::PromptOpened => BridgeResponse::PromptOpened,
            Dispatch::Patched { path } => BridgeResponse::Patched { path },
            Dispatch::Ignored(reason) => BridgeResponse::Ignored { reason },
            Dispatch::Dropped(reason) => BridgeResponse::Dropped { reason },
        }
    }
}

/// POST /api/v1/bridge
/// Accepts one `{kind, version, frame, payload}` envelope from a preview agent.
pub async fn handle_bridge_message(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<BridgeResponse>, AppError> {
    let envelope = Envelope::from_json(body)?;
    info!("Bridge message {} from {}", envelope.message.kind(), envelope.frame);

    let result = {
        let mut session = state.session.lock().await;
        dispatch(&mut session, envelope)
    };
    if result.needs_render() {
        state.scheduler.spawn_render();
    }
    Ok(Json(result.into()))
}
