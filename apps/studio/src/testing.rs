//! Test doubles for the remote collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;
use tokio::sync::Notify;

use crate::config::Config;
use crate::remote::{
    AiEditRequest, Assistant, MatchReport, RemoteError, RenderOutput, Renderer, ResumeUpload,
};
use crate::settings::{SettingsHandle, SettingsStore};
use crate::state::AppState;
use crate::workspace::VirtualFile;

/// Echoes the main file back, tagged with the call number.
#[derive(Default)]
pub struct StubRenderer {
    calls: AtomicUsize,
    failing: AtomicBool,
    delays: Mutex<VecDeque<Duration>>,
    last_paths: Mutex<Vec<String>>,
}

impl StubRenderer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delays the next un-delayed render call.
    pub fn push_delay(&self, delay: Duration) {
        self.delays.lock().unwrap().push_back(delay);
    }

    pub fn last_paths(&self) -> Vec<String> {
        self.last_paths.lock().unwrap().clone()
    }

    fn record(&self, files: &[Arc<VirtualFile>]) {
        *self.last_paths.lock().unwrap() = files.iter().map(|f| f.path.clone()).collect();
    }
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn render(
        &self,
        files: &[Arc<VirtualFile>],
        main_file: &str,
    ) -> Result<RenderOutput, RemoteError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.record(files);
        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Status {
                status: 500,
                message: "template error".into(),
            });
        }
        let main = files
            .iter()
            .find(|f| f.path == main_file)
            .map(|f| f.content.clone())
            .unwrap_or_default();
        Ok(RenderOutput {
            html: format!("{main}<!-- render {call} -->"),
            css_files: files
                .iter()
                .filter(|f| f.path.ends_with(".css"))
                .map(|f| (f.path.clone(), f.content.clone()))
                .collect(),
        })
    }

    async fn export_pdf(
        &self,
        files: &[Arc<VirtualFile>],
        _main_file: &str,
    ) -> Result<Bytes, RemoteError> {
        self.record(files);
        Ok(Bytes::from_static(b"%PDF-1.7 stub"))
    }
}

/// Replays a configured bulk result and records what it was asked.
#[derive(Default)]
pub struct StubAssistant {
    response: Mutex<Option<Result<Vec<VirtualFile>, String>>>,
    edits: Mutex<Vec<AiEditRequest>>,
    uploads: Mutex<Vec<String>>,
    matches: Mutex<Vec<(String, String)>>,
    hold: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

impl StubAssistant {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond_with(&self, files: Vec<VirtualFile>) {
        *self.response.lock().unwrap() = Some(Ok(files));
    }

    pub fn fail_with(&self, message: &str) {
        *self.response.lock().unwrap() = Some(Err(message.to_string()));
    }

    /// Parks the next AI edit. The first notify fires once the request has
    /// arrived; notify the second to let it answer.
    pub fn hold(&self) -> (Arc<Notify>, Arc<Notify>) {
        let pair = (Arc::new(Notify::new()), Arc::new(Notify::new()));
        *self.hold.lock().unwrap() = Some(pair.clone());
        pair
    }

    pub fn edit_requests(&self) -> Vec<AiEditRequest> {
        self.edits.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn matches(&self) -> Vec<(String, String)> {
        self.matches.lock().unwrap().clone()
    }

    fn reply(&self) -> Result<Vec<VirtualFile>, RemoteError> {
        match self.response.lock().unwrap().clone() {
            Some(Ok(files)) => Ok(files),
            Some(Err(message)) => Err(RemoteError::Rejected(message)),
            None => Err(RemoteError::Rejected("no response configured".into())),
        }
    }
}

#[async_trait]
impl Assistant for StubAssistant {
    async fn ai_edit(&self, request: AiEditRequest) -> Result<Vec<VirtualFile>, RemoteError> {
        self.edits.lock().unwrap().push(request);
        let hold = self.hold.lock().unwrap().take();
        if let Some((entered, release)) = hold {
            entered.notify_one();
            release.notified().await;
        }
        self.reply()
    }

    async fn upload_resume(&self, upload: ResumeUpload) -> Result<Vec<VirtualFile>, RemoteError> {
        self.uploads.lock().unwrap().push(upload.file_name);
        self.reply()
    }

    async fn match_resume(
        &self,
        resume_html: String,
        job_description: String,
    ) -> Result<MatchReport, RemoteError> {
        self.matches
            .lock()
            .unwrap()
            .push((resume_html, job_description));
        Ok(MatchReport {
            score: 42.0,
            matched_keywords: vec!["rust".into()],
            missing_keywords: vec!["kubernetes".into()],
            resume_keywords: Vec::new(),
            job_keywords: Vec::new(),
        })
    }
}

pub fn test_config(dir: &TempDir) -> Config {
    Config {
        port: 0,
        rust_log: "debug".into(),
        service_url: "http://render.invalid".into(),
        public_url: "http://studio.test".into(),
        main_file: "index.html".into(),
        render_debounce: Duration::from_millis(50),
        settings_path: dir.path().join("settings.json"),
        remote_timeout: Duration::from_secs(5),
    }
}

/// App state backed by stubs, with settings in a temporary directory that
/// lives as long as the returned guard.
pub fn test_state() -> (AppState, TempDir, Arc<StubRenderer>, Arc<StubAssistant>) {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let settings = SettingsHandle::load(SettingsStore::new(&config.settings_path)).unwrap();
    let renderer = StubRenderer::new();
    let assistant = StubAssistant::new();
    let state = AppState::new(config, settings, renderer.clone(), assistant.clone()).unwrap();
    (state, dir, renderer, assistant)
}
