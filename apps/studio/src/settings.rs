//! User settings for the AI-backed features.
//!
//! Loaded once at startup and written back on every change. The store
//! writes to a temporary file next to the target and renames it into place,
//! so a crash mid-write never leaves a truncated settings file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-0125";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not replace settings file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("settings task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
        }
    }
}

impl Settings {
    /// The API key, if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// A partial update. An empty `api_key` clears the stored key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl SettingsUpdate {
    fn apply(self, settings: &Settings) -> Settings {
        let mut next = settings.clone();
        if let Some(key) = self.api_key {
            let key = key.trim().to_string();
            next.api_key = (!key.is_empty()).then_some(key);
        }
        if let Some(model) = self.model.map(|m| m.trim().to_string()) {
            if !model.is_empty() {
                next.model = model;
            }
        }
        next
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means defaults.
    pub fn load(&self) -> Result<Settings, SettingsError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, settings)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        file.persist(&self.path)?;
        Ok(())
    }
}

/// Shared handle carried in `AppState`.
#[derive(Clone)]
pub struct SettingsHandle {
    store: Arc<SettingsStore>,
    current: Arc<RwLock<Settings>>,
}

impl SettingsHandle {
    pub fn load(store: SettingsStore) -> Result<Self, SettingsError> {
        let settings = store.load()?;
        info!(
            "Loaded settings from {} (model: {}, api key: {})",
            store.path().display(),
            settings.model,
            if settings.api_key().is_some() { "set" } else { "unset" }
        );
        Ok(Self {
            store: Arc::new(store),
            current: Arc::new(RwLock::new(settings)),
        })
    }

    pub async fn get(&self) -> Settings {
        self.current.read().await.clone()
    }

    /// Applies `update`, saving only when something changed.
    pub async fn update(&self, update: SettingsUpdate) -> Result<Settings, SettingsError> {
        let mut current = self.current.write().await;
        let next = update.apply(&current);
        if next != *current {
            let store = Arc::clone(&self.store);
            let to_save = next.clone();
            tokio::task::spawn_blocking(move || store.save(&to_save)).await??;
            *current = next;
            info!("Settings saved (model: {})", current.model);
        }
        Ok(current.clone())
    }
}
