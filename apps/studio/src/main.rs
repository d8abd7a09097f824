mod assist;
mod bridge;
mod config;
mod dom;
mod errors;
mod locator;
mod patcher;
mod preview;
mod remote;
mod routes;
mod session;
mod settings;
mod state;
mod workspace;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::remote::ServiceClient;
use crate::routes::build_router;
use crate::settings::{SettingsHandle, SettingsStore};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Studio v{}", env!("CARGO_PKG_VERSION"));

    let settings = SettingsHandle::load(SettingsStore::new(&config.settings_path))?;

    // One client serves rendering, PDF export and the AI operations
    let service = Arc::new(ServiceClient::new(
        config.service_url.clone(),
        config.remote_timeout,
    )?);
    info!("Service client initialized ({})", config.service_url);

    let state = AppState::new(config.clone(), settings, service.clone(), service)?;
    info!(
        "Workspace seeded (main file: {}, render debounce: {:?})",
        config.main_file,
        state.scheduler.delay()
    );

    // First preview
    state.scheduler.spawn_render();

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
