use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::preview::RenderScheduler;
use crate::remote::{Assistant, Renderer};
use crate::session::{EditorSession, SharedSession};
use crate::settings::SettingsHandle;
use crate::workspace::{Workspace, WorkspaceError};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub session: SharedSession,
    pub renderer: Arc<dyn Renderer>,
    pub assistant: Arc<dyn Assistant>,
    /// Debounces and orders preview renders for `session`.
    pub scheduler: RenderScheduler,
    pub settings: SettingsHandle,
    pub config: Config,
}

impl AppState {
    /// Seeds a fresh workspace with the sample resume.
    pub fn new(
        config: Config,
        settings: SettingsHandle,
        renderer: Arc<dyn Renderer>,
        assistant: Arc<dyn Assistant>,
    ) -> Result<Self, WorkspaceError> {
        let workspace = Workspace::seeded(config.main_file.clone())?;
        let session: SharedSession = Arc::new(Mutex::new(EditorSession::new(workspace)));
        let scheduler = RenderScheduler::new(
            Arc::clone(&session),
            Arc::clone(&renderer),
            config.render_debounce,
            config.events_url(),
        );
        Ok(Self {
            session,
            renderer,
            assistant,
            scheduler,
            settings,
            config,
        })
    }
}
