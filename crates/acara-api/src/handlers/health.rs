use crate::constants::API_VERSION;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const CHECK_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Serialize)]
struct HealthCheckResponse {
    status: &'static str,
    version: &'static str,
    document_store: String,
    storage_backend: String,
}

/// Readiness: the document store answers a one-row listing.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let document_store = match tokio::time::timeout(
        CHECK_TIMEOUT,
        state.store.list_documents(
            acara_core::constants::RECORD_COLLECTION,
            1,
            0,
        ),
    )
    .await
    {
        Ok(Ok(_)) => "healthy".to_string(),
        Ok(Err(e)) => format!("unhealthy: {}", e),
        Err(_) => "timeout".to_string(),
    };

    let healthy = document_store == "healthy";
    let body = HealthCheckResponse {
        status: if healthy { "healthy" } else { "degraded" },
        version: API_VERSION,
        document_store,
        storage_backend: state.storage.backend_type().to_string(),
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(body))
}
