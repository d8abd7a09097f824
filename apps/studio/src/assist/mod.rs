//! AI-backed operations: instruction edits on a selected element, resume
//! upload, resume/job matching and PDF export.
//!
//! Every bulk result is merged into the workspace against the file versions
//! captured when the request was sent, so local edits made while the
//! service was working surface as a conflict instead of being lost.

pub mod handlers;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::bridge::{FrameId, Point, SelectionEvent};
use crate::errors::AppError;
use crate::remote::{AiEditRequest, MatchReport, RemoteError, ResumeUpload};
use crate::state::AppState;
use crate::workspace::{BaseVersions, VirtualFile};

/// Tags whose text is specific enough to appear in a selector.
const TEXT_TAGS: &[&str] = &["p", "span", "h1", "h2", "h3", "h4", "h5", "h6", "div"];

const SNIPPET_CHARS: usize = 20;

/// Extensions accepted by resume upload.
pub const UPLOAD_EXTENSIONS: &[&str] = &[".pdf", ".txt"];

/// The prompt opened by the last selection in the preview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiEditPrompt {
    pub element: SelectionEvent,
    /// On-screen position of the selected element.
    pub position: Point,
    /// The file open in the editor when the selection was made.
    pub target_path: Option<String>,
    pub frame: FrameId,
    pub opened_at: DateTime<Utc>,
}

/// A CSS-like selector the AI service uses to find the element.
///
/// `#id`, then `.firstClass`, then `tag:contains("...")` with the first
/// characters of the element's text for text-bearing tags, then the bare tag.
pub fn selector_for(element: &SelectionEvent) -> String {
    if !element.id.is_empty() {
        return format!("#{}", element.id);
    }
    if let Some(class) = element.class_name.split_whitespace().next() {
        return format!(".{class}");
    }
    let tag = match element.tag_name.to_ascii_lowercase() {
        tag if tag.is_empty() => "p".to_string(),
        tag => tag,
    };
    if TEXT_TAGS.contains(&tag.as_str()) {
        let snippet: String = element.text_content.chars().take(SNIPPET_CHARS).collect();
        let snippet = snippet.trim();
        if !snippet.is_empty() {
            return format!("{tag}:contains(\"{snippet}\")");
        }
    }
    tag
}

/// User-facing text for a failed bulk operation.
pub(crate) fn failure_message(err: &RemoteError) -> String {
    match err {
        RemoteError::Rejected(msg) => format!("Failed to update content: {msg}"),
        RemoteError::Http(e) if e.is_connect() || e.is_timeout() => {
            "Server connection error".to_string()
        }
        other => other.to_string(),
    }
}

async fn require_api_key(state: &AppState) -> Result<(String, String), AppError> {
    let settings = state.settings.get().await;
    let key = settings.api_key().ok_or(AppError::ApiKeyRequired)?;
    Ok((key.to_string(), settings.model))
}

/// Merges a bulk result and re-renders. Returns the paths now in the
/// workspace.
async fn apply_result(
    state: &AppState,
    result: Result<Vec<VirtualFile>, RemoteError>,
    base: &BaseVersions,
) -> Result<Vec<String>, AppError> {
    let updated = {
        let mut session = state.session.lock().await;
        let files = match result {
            Ok(files) => files,
            Err(err) => {
                let message = failure_message(&err);
                session.raise(message.clone());
                return Err(AppError::Remote(message));
            }
        };
        if let Err(err) = session.workspace.apply_bulk_update(files, Some(base)) {
            session.raise(err.to_string());
            return Err(err.into());
        }
        session.banner = None;
        session
            .workspace
            .files()
            .iter()
            .map(|f| f.path.clone())
            .collect()
    };
    state.scheduler.render_now().await;
    Ok(updated)
}

/// Applies `instruction` to the element behind the open prompt.
pub async fn apply_ai_edit(state: &AppState, instruction: &str) -> Result<Vec<String>, AppError> {
    let instruction = instruction.trim();
    if instruction.is_empty() {
        return Err(AppError::Validation("Please enter an instruction".into()));
    }
    let (prompt, files, base, main_file) = {
        let session = state.session.lock().await;
        let prompt = session
            .prompt
            .clone()
            .ok_or_else(|| AppError::NotFound("no element is selected".into()))?;
        let files = session.workspace.files();
        (
            prompt,
            files.renderable(),
            files.versions(),
            session.workspace.main_file().to_string(),
        )
    };
    let (api_key, model) = require_api_key(state).await?;

    let request = AiEditRequest {
        api_key,
        model,
        target_path: prompt.target_path.clone().unwrap_or(main_file),
        selector: selector_for(&prompt.element),
        instruction: instruction.to_string(),
        files,
    };
    info!(
        "AI edit of '{}' in '{}' ({} file(s))",
        request.selector,
        request.target_path,
        request.files.len()
    );
    let result = state.assistant.ai_edit(request).await;
    let updated = apply_result(state, result, &base).await?;
    state.session.lock().await.prompt = None;
    Ok(updated)
}

/// Replaces the workspace content with a resume extracted from an upload.
pub async fn upload_resume(
    state: &AppState,
    file_name: String,
    bytes: Bytes,
) -> Result<Vec<String>, AppError> {
    let lower = file_name.to_ascii_lowercase();
    if !UPLOAD_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return Err(AppError::Validation(format!(
            "unsupported file '{file_name}'; upload a .pdf or .txt resume"
        )));
    }
    if bytes.is_empty() {
        return Err(AppError::Validation("Please select a file to upload".into()));
    }
    let (api_key, model) = require_api_key(state).await?;
    let (files, base) = {
        let session = state.session.lock().await;
        let files = session.workspace.files();
        (files.renderable(), files.versions())
    };

    info!("Uploading resume '{file_name}' ({} bytes)", bytes.len());
    let upload = ResumeUpload {
        file_name,
        bytes,
        api_key,
        model,
        files,
    };
    let result = state.assistant.upload_resume(upload).await;
    apply_result(state, result, &base).await
}

/// Scores the displayed resume against a job description. Without one,
/// the workspace's job-description file is used.
pub async fn match_resume(
    state: &AppState,
    job_description: Option<String>,
) -> Result<MatchReport, AppError> {
    let (resume_html, stored) = {
        let session = state.session.lock().await;
        let html = session.preview.html().map(str::to_string);
        let stored = session
            .workspace
            .files()
            .job_descriptions()
            .next()
            .map(|f| f.content.clone());
        (html, stored)
    };
    let job_description = job_description
        .filter(|jd| !jd.trim().is_empty())
        .or(stored)
        .filter(|jd| !jd.trim().is_empty())
        .ok_or_else(|| {
            AppError::Validation(
                "Please enter a job description or upload a job description file.".into(),
            )
        })?;
    let resume_html = resume_html.ok_or_else(|| {
        AppError::Validation(
            "Could not retrieve resume content. Please make sure your resume is displayed in the preview."
                .into(),
        )
    })?;

    let report = state
        .assistant
        .match_resume(resume_html, job_description)
        .await?;
    info!("Resume match score: {:.1}", report.score);
    Ok(report)
}

/// Exports the renderable files as a PDF.
pub async fn export_pdf(state: &AppState) -> Result<Bytes, AppError> {
    let (files, main_file) = {
        let session = state.session.lock().await;
        (
            session.workspace.files().renderable(),
            session.workspace.main_file().to_string(),
        )
    };
    match state.renderer.export_pdf(&files, &main_file).await {
        Ok(pdf) => {
            info!("Exported PDF ({} bytes)", pdf.len());
            Ok(pdf)
        }
        Err(err) => {
            let message = match err {
                RemoteError::Rejected(msg) => msg,
                other => format!("PDF export failed: {other}"),
            };
            state.session.lock().await.raise(message.clone());
            Err(AppError::Remote(message))
        }
    }
}
