pub mod health;
pub mod settings;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::assist::handlers as assist;
use crate::bridge::handlers as bridge;
use crate::preview::handlers as preview;
use crate::state::AppState;
use crate::workspace::handlers as files;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Workspace
        .route(
            "/api/v1/files",
            get(files::handle_list_files)
                .post(files::handle_create_file)
                .delete(files::handle_delete_file),
        )
        .route("/api/v1/files/content", put(files::handle_edit_file))
        .route("/api/v1/files/rename", post(files::handle_rename_file))
        .route("/api/v1/files/select", post(files::handle_select_file))
        // Preview
        .route("/api/v1/preview", get(preview::handle_get_preview))
        .route("/api/v1/preview/render", post(preview::handle_render))
        .route("/api/v1/preview/frame", put(preview::handle_set_frame_origin))
        .route("/api/v1/preview/events", post(preview::handle_gesture))
        .route("/api/v1/bridge", post(bridge::handle_bridge_message))
        // AI features
        .route(
            "/api/v1/prompt",
            get(assist::handle_get_prompt).delete(assist::handle_dismiss_prompt),
        )
        .route("/api/v1/ai-edit", post(assist::handle_ai_edit))
        .route("/api/v1/upload-resume", post(assist::handle_upload_resume))
        .route("/api/v1/match-resume", post(assist::handle_match_resume))
        .route("/api/v1/export-pdf", post(assist::handle_export_pdf))
        // Settings
        .route(
            "/api/v1/settings",
            get(settings::handle_get_settings).put(settings::handle_update_settings),
        )
        .with_state(state)
}
