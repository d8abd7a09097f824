use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    AiEditRequest, Assistant, MatchReport, RemoteError, RenderOutput, Renderer, ResumeUpload,
};
use crate::workspace::VirtualFile;

/// HTTP client for the collaborator service that renders, exports and runs
/// AI operations.
#[derive(Clone)]
pub struct ServiceClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FilesRequest<'a> {
    files: &'a [Arc<VirtualFile>],
    main_file: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkUpdateResponse {
    #[serde(default)]
    success: bool,
    updated_files: Option<Vec<VirtualFile>>,
    error: Option<String>,
    details: Option<String>,
}

#[derive(Deserialize)]
struct MatchResponse {
    match_results: MatchReport,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    details: Option<String>,
}

impl ErrorBody {
    fn message(self) -> Option<String> {
        match (self.error, self.details) {
            (Some(error), Some(details)) => Some(format!("{error}: {details}")),
            (Some(message), None) | (None, Some(message)) => Some(message),
            (None, None) => None,
        }
    }
}

impl ServiceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Fails with the service's own error message on a non-success status.
    async fn check(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!("Service returned {status}: {body}");
        Err(RemoteError::Status {
            status: status.as_u16(),
            message: error_message(body.as_bytes()).unwrap_or(body),
        })
    }

    async fn bulk_update(response: Response) -> Result<Vec<VirtualFile>, RemoteError> {
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(bulk_failure(status.as_u16(), &body));
        }
        let body: BulkUpdateResponse = serde_json::from_slice(&body)?;
        match (body.success, body.updated_files) {
            (true, Some(files)) => Ok(files),
            _ => Err(RemoteError::Rejected(
                body.error
                    .or(body.details)
                    .unwrap_or_else(|| "the service did not return updated files".to_string()),
            )),
        }
    }
}

/// A failed bulk operation. A JSON error report is the service's own words
/// and is passed on as a rejection; anything else is a transport failure.
fn bulk_failure(status: u16, body: &[u8]) -> RemoteError {
    let report = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.or(b.details));
    match report {
        Some(message) => {
            debug!("Service rejected bulk update ({status}): {message}");
            RemoteError::Rejected(message)
        }
        None => {
            let message = String::from_utf8_lossy(body).into_owned();
            warn!("Service returned {status}: {message}");
            RemoteError::Status { status, message }
        }
    }
}

fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::message)
}

fn looks_like_json(content_type: &str, body: &[u8]) -> bool {
    if content_type.starts_with("application/json") {
        return true;
    }
    body.iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'{')
}

#[async_trait]
impl Renderer for ServiceClient {
    async fn render(
        &self,
        files: &[Arc<VirtualFile>],
        main_file: &str,
    ) -> Result<RenderOutput, RemoteError> {
        let response = self
            .client
            .post(self.url("/render"))
            .json(&FilesRequest { files, main_file })
            .send()
            .await?;
        let output: RenderOutput = Self::check(response).await?.json().await?;
        debug!(
            "Rendered {main_file}: {} bytes, {} stylesheet(s)",
            output.html.len(),
            output.css_files.len()
        );
        Ok(output)
    }

    async fn export_pdf(
        &self,
        files: &[Arc<VirtualFile>],
        main_file: &str,
    ) -> Result<Bytes, RemoteError> {
        let response = self
            .client
            .post(self.url("/export-pdf"))
            .json(&FilesRequest { files, main_file })
            .send()
            .await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let body = response.bytes().await?;

        if looks_like_json(&content_type, &body) {
            let message = error_message(&body).unwrap_or_else(|| "unknown error".to_string());
            return Err(RemoteError::Rejected(format!("PDF export failed: {message}")));
        }
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        if !body.starts_with(b"%PDF") {
            return Err(RemoteError::Malformed(format!(
                "expected a PDF document, got {} bytes of {content_type}",
                body.len()
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl Assistant for ServiceClient {
    async fn ai_edit(&self, request: AiEditRequest) -> Result<Vec<VirtualFile>, RemoteError> {
        let response = self
            .client
            .post(self.url("/ai-edit"))
            .json(&request)
            .send()
            .await?;
        Self::bulk_update(response).await
    }

    async fn upload_resume(&self, upload: ResumeUpload) -> Result<Vec<VirtualFile>, RemoteError> {
        let files = serde_json::to_string(&upload.files)?;
        let form = Form::new()
            .part(
                "file",
                Part::bytes(upload.bytes.to_vec()).file_name(upload.file_name),
            )
            .text("apiKey", upload.api_key)
            .text("model", upload.model)
            .text("files", files);
        let response = self
            .client
            .post(self.url("/upload-resume"))
            .multipart(form)
            .send()
            .await?;
        Self::bulk_update(response).await
    }

    async fn match_resume(
        &self,
        resume_html: String,
        job_description: String,
    ) -> Result<MatchReport, RemoteError> {
        let resume = Part::text(resume_html)
            .file_name("resume.html")
            .mime_str("text/html")?;
        let form = Form::new()
            .part("file", resume)
            .text("jobDescription", job_description);
        let response = self
            .client
            .post(self.url("/match-resume"))
            .multipart(form)
            .send()
            .await?;
        let body: MatchResponse = Self::check(response).await?.json().await?;
        Ok(body.match_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_bodies_are_sniffed() {
        assert!(looks_like_json("application/json; charset=utf-8", b"{}"));
        assert!(looks_like_json("application/octet-stream", b"  {\"error\": \"x\"}"));
        assert!(!looks_like_json("application/pdf", b"%PDF-1.7"));
        assert!(!looks_like_json("", b""));
    }

    #[test]
    fn test_error_message_prefers_error_then_details() {
        assert_eq!(
            error_message(br#"{"error": "PDF generation failed", "details": "no fonts"}"#),
            Some("PDF generation failed: no fonts".to_string())
        );
        assert_eq!(
            error_message(br#"{"details": "no fonts"}"#),
            Some("no fonts".to_string())
        );
        assert_eq!(error_message(b"<html>oops</html>"), None);
    }

    #[test]
    fn test_bulk_error_report_is_a_rejection() {
        let err = bulk_failure(500, br#"{"success": false, "error": "Invalid API key"}"#);
        assert!(matches!(&err, RemoteError::Rejected(msg) if msg == "Invalid API key"));
        assert_eq!(
            crate::assist::failure_message(&err),
            "Failed to update content: Invalid API key"
        );

        let err = bulk_failure(400, br#"{"details": "resume too long"}"#);
        assert!(matches!(err, RemoteError::Rejected(msg) if msg == "resume too long"));
    }

    #[test]
    fn test_bulk_failure_without_report_keeps_status() {
        let err = bulk_failure(502, b"Bad Gateway");
        assert!(matches!(
            err,
            RemoteError::Status { status: 502, message } if message == "Bad Gateway"
        ));
    }

    #[test]
    fn test_bulk_update_response_shape() {
        let body: BulkUpdateResponse = serde_json::from_str(
            r#"{"success": true, "updatedFiles": [{"name": "index.html", "path": "index.html", "content": "<p>x</p>", "type": "file"}]}"#,
        )
        .unwrap();
        assert!(body.success);
        assert_eq!(body.updated_files.unwrap()[0].path, "index.html");
    }

    #[test]
    fn test_files_request_wire_shape() {
        let files = vec![Arc::new(VirtualFile::file("index.html", "<p>x</p>"))];
        let value = serde_json::to_value(FilesRequest {
            files: &files,
            main_file: "index.html",
        })
        .unwrap();
        assert_eq!(value["mainFile"], "index.html");
        assert_eq!(value["files"][0]["fileType"], "regular");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ServiceClient::new("http://localhost:5001/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url("/render"), "http://localhost:5001/render");
    }
}
