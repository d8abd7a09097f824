use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::assist::AiEditPrompt;
use crate::preview::{Preview, RenderStatus};
use crate::workspace::Workspace;

pub type SharedSession = Arc<Mutex<EditorSession>>;

/// An error shown to the user until the next one replaces it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

/// Everything the editor holds for one open workspace.
#[derive(Debug)]
pub struct EditorSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub workspace: Workspace,
    pub preview: Preview,
    pub render: RenderStatus,
    /// The AI edit prompt opened by the last selection, if any.
    pub prompt: Option<AiEditPrompt>,
    pub banner: Option<Banner>,
}

impl EditorSession {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            workspace,
            preview: Preview::default(),
            render: RenderStatus::default(),
            prompt: None,
            banner: None,
        }
    }

    pub fn raise(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("Session {}: {message}", self.id);
        self.banner = Some(Banner {
            message,
            raised_at: Utc::now(),
        });
    }
}
