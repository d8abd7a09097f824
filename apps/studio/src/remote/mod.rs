//! Remote collaborators: the render/PDF service and the AI service.
//!
//! Both are traits carried in `AppState` as trait objects so handlers and
//! the render scheduler never depend on the HTTP client directly.

pub mod client;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::workspace::VirtualFile;

pub use client::ServiceClient;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service error (status {status}): {message}")]
    Status { status: u16, message: String },

    /// The service answered but reported failure.
    #[error("{0}")]
    Rejected(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderOutput {
    pub html: String,
    /// Stylesheet path to content.
    #[serde(default)]
    pub css_files: BTreeMap<String, String>,
}

/// Everything an AI edit needs. `files` must already exclude job
/// descriptions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiEditRequest {
    pub api_key: String,
    pub model: String,
    pub target_path: String,
    pub selector: String,
    pub instruction: String,
    pub files: Vec<Arc<VirtualFile>>,
}

#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub file_name: String,
    pub bytes: Bytes,
    pub api_key: String,
    pub model: String,
    pub files: Vec<Arc<VirtualFile>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub score: f64,
    #[serde(default)]
    pub matched_keywords: Vec<String>,
    #[serde(default)]
    pub missing_keywords: Vec<String>,
    #[serde(default)]
    pub resume_keywords: Vec<String>,
    #[serde(default)]
    pub job_keywords: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Traits
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(
        &self,
        files: &[Arc<VirtualFile>],
        main_file: &str,
    ) -> Result<RenderOutput, RemoteError>;

    /// Returns the PDF bytes. A JSON body is always an error report, even
    /// when the status says otherwise.
    async fn export_pdf(
        &self,
        files: &[Arc<VirtualFile>],
        main_file: &str,
    ) -> Result<Bytes, RemoteError>;
}

/// AI-backed operations. Each bulk operation returns a complete
/// replacement set of renderable files.
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn ai_edit(&self, request: AiEditRequest) -> Result<Vec<VirtualFile>, RemoteError>;

    async fn upload_resume(&self, upload: ResumeUpload) -> Result<Vec<VirtualFile>, RemoteError>;

    async fn match_resume(
        &self,
        resume_html: String,
        job_description: String,
    ) -> Result<MatchReport, RemoteError>;
}
