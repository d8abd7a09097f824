use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::AiEditPrompt;
use crate::errors::AppError;
use crate::remote::MatchReport;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AiEditBody {
    pub instruction: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchBody {
    #[serde(default)]
    pub job_description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdatedFiles {
    pub files: Vec<String>,
}

/// GET /api/v1/prompt
pub async fn handle_get_prompt(
    State(state): State<AppState>,
) -> Result<Json<AiEditPrompt>, AppError> {
    state
        .session
        .lock()
        .await
        .prompt
        .clone()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("no AI prompt is open".into()))
}

/// DELETE /api/v1/prompt
pub async fn handle_dismiss_prompt(State(state): State<AppState>) -> StatusCode {
    state.session.lock().await.prompt = None;
    StatusCode::NO_CONTENT
}

/// POST /api/v1/ai-edit
pub async fn handle_ai_edit(
    State(state): State<AppState>,
    Json(req): Json<AiEditBody>,
) -> Result<Json<UpdatedFiles>, AppError> {
    let files = super::apply_ai_edit(&state, &req.instruction).await?;
    Ok(Json(UpdatedFiles { files }))
}

/// POST /api/v1/upload-resume
/// Multipart form with a single `file` field.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UpdatedFiles>, AppError> {
    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("could not read upload: {e}")))?;
        upload = Some((file_name, bytes));
    }
    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::Validation("Please select a file to upload".into()))?;

    let files = super::upload_resume(&state, file_name, bytes).await?;
    Ok(Json(UpdatedFiles { files }))
}

/// POST /api/v1/match-resume
pub async fn handle_match_resume(
    State(state): State<AppState>,
    Json(req): Json<MatchBody>,
) -> Result<Json<MatchReport>, AppError> {
    Ok(Json(super::match_resume(&state, req.job_description).await?))
}

/// POST /api/v1/export-pdf
pub async fn handle_export_pdf(State(state): State<AppState>) -> Result<Response, AppError> {
    let pdf = super::export_pdf(&state).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"resume.pdf\""),
        ],
        pdf,
    )
        .into_response())
}
