use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::settings::{Settings, SettingsUpdate};
use crate::state::AppState;

/// What the client may see. The key itself is never echoed back.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub has_api_key: bool,
    pub model: String,
}

impl From<Settings> for SettingsView {
    fn from(settings: Settings) -> Self {
        Self {
            has_api_key: settings.api_key().is_some(),
            model: settings.model,
        }
    }
}

/// GET /api/v1/settings
pub async fn handle_get_settings(State(state): State<AppState>) -> Json<SettingsView> {
    Json(state.settings.get().await.into())
}

/// PUT /api/v1/settings
pub async fn handle_update_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<SettingsView>, AppError> {
    let saved = state.settings.update(update).await?;
    Ok(Json(saved.into()))
}
