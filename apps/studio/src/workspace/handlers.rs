use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{NewFile, VirtualFile, Workspace};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    pub files: Vec<Arc<VirtualFile>>,
    pub current: Option<String>,
    pub main_file: String,
}

impl From<&Workspace> for WorkspaceSnapshot {
    fn from(ws: &Workspace) -> Self {
        Self {
            files: ws.files().iter().cloned().collect(),
            current: ws.current_path().map(str::to_string),
            main_file: ws.main_file().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    /// Defaults to the current file.
    #[serde(default)]
    pub path: Option<String>,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub path: String,
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
pub struct PathRequest {
    pub path: String,
}

/// Runs `change` against the workspace and returns the new snapshot. When
/// the renderable files or the current file changed, the preview is
/// re-rendered immediately.
async fn mutate<F>(state: &AppState, change: F) -> Result<Json<WorkspaceSnapshot>, AppError>
where
    F: FnOnce(&mut Workspace) -> Result<(), AppError>,
{
    let (snapshot, stale) = {
        let mut session = state.session.lock().await;
        let before = session.workspace.current_path().map(str::to_string);
        let versions = session.workspace.files().versions();
        change(&mut session.workspace)?;
        let stale = session.workspace.current_path() != before.as_deref()
            || session.workspace.files().versions() != versions;
        (WorkspaceSnapshot::from(&session.workspace), stale)
    };
    if stale {
        state.scheduler.spawn_render();
    }
    Ok(Json(snapshot))
}

/// GET /api/v1/files
pub async fn handle_list_files(State(state): State<AppState>) -> Json<WorkspaceSnapshot> {
    let session = state.session.lock().await;
    Json(WorkspaceSnapshot::from(&session.workspace))
}

/// POST /api/v1/files
pub async fn handle_create_file(
    State(state): State<AppState>,
    Json(req): Json<NewFile>,
) -> Result<Json<WorkspaceSnapshot>, AppError> {
    mutate(&state, |ws| {
        let created = ws.create(req)?;
        info!("Created {:?} '{}'", created.kind, created.path);
        Ok(())
    })
    .await
}

/// PUT /api/v1/files/content
/// Saves editor content and schedules a debounced render.
pub async fn handle_edit_file(
    State(state): State<AppState>,
    Json(req): Json<EditRequest>,
) -> Result<Json<WorkspaceSnapshot>, AppError> {
    let (snapshot, renderable) = {
        let mut session = state.session.lock().await;
        let path = req
            .path
            .or_else(|| session.workspace.current_path().map(str::to_string))
            .ok_or_else(|| AppError::Validation("no file is open".into()))?;
        session.workspace.edit(&path, req.content)?;
        let renderable = session
            .workspace
            .files()
            .get(&path)
            .is_some_and(|f| f.is_renderable());
        (WorkspaceSnapshot::from(&session.workspace), renderable)
    };
    if renderable {
        state.scheduler.schedule();
    }
    Ok(Json(snapshot))
}

/// POST /api/v1/files/rename
pub async fn handle_rename_file(
    State(state): State<AppState>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<WorkspaceSnapshot>, AppError> {
    mutate(&state, |ws| {
        ws.rename(&req.path, &req.new_name)?;
        info!("Renamed '{}' to '{}'", req.path, req.new_name.trim());
        Ok(())
    })
    .await
}

/// POST /api/v1/files/select
pub async fn handle_select_file(
    State(state): State<AppState>,
    Json(req): Json<PathRequest>,
) -> Result<Json<WorkspaceSnapshot>, AppError> {
    let snapshot = {
        let mut session = state.session.lock().await;
        session.workspace.select(&req.path)?;
        WorkspaceSnapshot::from(&session.workspace)
    };
    state.scheduler.spawn_render();
    Ok(Json(snapshot))
}

/// DELETE /api/v1/files?path=...
pub async fn handle_delete_file(
    State(state): State<AppState>,
    Query(req): Query<PathRequest>,
) -> Result<Json<WorkspaceSnapshot>, AppError> {
    mutate(&state, |ws| {
        ws.delete(&req.path)?;
        info!("Deleted '{}'", req.path);
        Ok(())
    })
    .await
}
