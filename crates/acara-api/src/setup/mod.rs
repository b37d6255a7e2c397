//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use acara_core::Config;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry()?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let store = database::setup_document_store(&config).await?;
    let storage = storage::setup_storage(&config).await?;

    let state = services::initialize_services(&config, store, storage)?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
