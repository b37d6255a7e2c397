//! Route configuration and setup

use crate::api_doc::openapi_spec;
use crate::constants::{API_PREFIX, HTTP_CONCURRENCY_LIMIT};
use crate::handlers;
use crate::state::AppState;
use acara_core::Config;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// JSON bodies may carry several inline base64 images; the per-image ceiling
/// is enforced by the normalizer.
const RECORD_BODY_LIMIT_BYTES: usize = 64 * 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let api = Router::new()
        .route("/uploads/authorize", post(handlers::uploads::authorize_upload))
        .route("/upload-authorization", post(handlers::uploads::authorize_upload))
        .route(
            "/records",
            post(handlers::records::create_record).get(handlers::records::list_records),
        )
        .route("/records/{id}", get(handlers::records::get_record))
        .route(
            "/records/{id}/print-data",
            get(handlers::records::get_print_data),
        )
        .route("/documents/render", post(handlers::documents::render_document))
        .route("/render-document", post(handlers::documents::render_document))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(RECORD_BODY_LIMIT_BYTES))
        .merge(storage_object_routes());

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/openapi.json", get(|| async { Json(openapi_spec()) }))
        .nest(API_PREFIX, api)
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"))
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Signed object endpoints of the local backend.
#[cfg(feature = "storage-local")]
fn storage_object_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/storage/{*key}",
            get(handlers::storage_objects::get_object).put(handlers::storage_objects::put_object),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(
            acara_core::constants::MAX_IMAGE_SIZE_BYTES as usize,
        ))
}

#[cfg(not(feature = "storage-local"))]
fn storage_object_routes() -> Router<Arc<AppState>> {
    Router::new()
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::OPTIONS];

    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
            .expose_headers([axum::http::header::CONTENT_DISPOSITION])
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
            .expose_headers([axum::http::header::CONTENT_DISPOSITION])
    };
    Ok(cors)
}
