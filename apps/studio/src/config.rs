use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every variable has a default suitable for local development.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Base URL of the render / PDF / AI collaborator service.
    pub service_url: String,
    /// Base URL the preview agent posts gestures back to.
    pub public_url: String,
    pub main_file: String,
    pub render_debounce: Duration,
    pub settings_path: PathBuf,
    pub remote_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let port = parse_env("PORT", 8080u16)?;
        Ok(Config {
            port,
            rust_log: env_or("RUST_LOG", "info"),
            service_url: env_or("SERVICE_URL", "http://localhost:5001"),
            public_url: std::env::var("PUBLIC_URL")
                .unwrap_or_else(|_| format!("http://localhost:{port}")),
            main_file: env_or("MAIN_FILE", "index.html"),
            render_debounce: Duration::from_millis(parse_env("RENDER_DEBOUNCE_MS", 1000u64)?),
            settings_path: PathBuf::from(env_or("SETTINGS_PATH", ".studio/settings.json")),
            remote_timeout: Duration::from_secs(parse_env("REMOTE_TIMEOUT_SECS", 120u64)?),
        })
    }

    /// Where the injected preview agent sends gestures.
    pub fn events_url(&self) -> String {
        format!(
            "{}/api/v1/preview/events",
            self.public_url.trim_end_matches('/')
        )
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
