use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Directive, Gesture, RenderOutcome};
use crate::bridge::{dispatch, FrameId, Point};
use crate::errors::AppError;
use crate::session::Banner;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub frame: FrameId,
    pub html: Option<String>,
    pub rendering: bool,
    pub error: Option<String>,
    pub rendered_at: Option<DateTime<Utc>>,
    pub banner: Option<Banner>,
}

#[derive(Debug, Deserialize)]
pub struct GestureRequest {
    pub frame: FrameId,
    pub gesture: Gesture,
}

#[derive(Debug, Default, Serialize)]
pub struct GestureResponse {
    /// The frame that sent the gesture is no longer displayed.
    pub stale: bool,
    pub directives: Vec<Directive>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum RenderResponse {
    Applied { frame: FrameId },
    Failed { error: String },
    Superseded,
}

impl From<RenderOutcome> for RenderResponse {
    fn from(outcome: RenderOutcome) -> Self {
        match outcome {
            RenderOutcome::Applied(frame) => RenderResponse::Applied { frame },
            RenderOutcome::Failed(error) => RenderResponse::Failed { error },
            RenderOutcome::Superseded => RenderResponse::Superseded,
        }
    }
}

/// GET /api/v1/preview
pub async fn handle_get_preview(State(state): State<AppState>) -> Json<PreviewResponse> {
    let session = state.session.lock().await;
    Json(PreviewResponse {
        frame: session.preview.frame(),
        html: session.preview.html().map(str::to_string),
        rendering: session.render.is_rendering(),
        error: session.render.last_error.clone(),
        rendered_at: session.preview.rendered_at(),
        banner: session.banner.clone(),
    })
}

/// POST /api/v1/preview/render
pub async fn handle_render(State(state): State<AppState>) -> Json<RenderResponse> {
    Json(state.scheduler.render_now().await.into())
}

/// PUT /api/v1/preview/frame
/// Records where the preview frame sits on screen so prompt positions can
/// be made absolute.
pub async fn handle_set_frame_origin(
    State(state): State<AppState>,
    Json(origin): Json<Point>,
) -> Result<Json<Point>, AppError> {
    if !origin.x.is_finite() || !origin.y.is_finite() {
        return Err(AppError::Validation("frame origin must be finite".into()));
    }
    state.session.lock().await.preview.set_origin(origin);
    Ok(Json(origin))
}

/// POST /api/v1/preview/events
/// Runs one gesture from the injected agent and returns the directives the
/// frame must apply.
pub async fn handle_gesture(
    State(state): State<AppState>,
    Json(req): Json<GestureRequest>,
) -> Json<GestureResponse> {
    let mut patched = false;
    let directives = {
        let mut session = state.session.lock().await;
        let Some(agent) = session.preview.agent_mut(req.frame) else {
            debug!("Gesture from retired {}", req.frame);
            return Json(GestureResponse {
                stale: true,
                directives: Vec::new(),
            });
        };
        let step = agent.handle(req.gesture);
        for envelope in step.messages {
            let result = dispatch(&mut session, envelope);
            patched |= result.needs_render();
        }
        step.directives
    };
    if patched {
        state.scheduler.spawn_render();
    }
    Json(GestureResponse {
        stale: false,
        directives,
    })
}
