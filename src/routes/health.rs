use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

/// Health check endpoint
///
/// Returns 503 when the database is unreachable. The cache is reported but
/// never makes the service unhealthy, since every cache failure degrades to
/// a miss.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_status = match state.store.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            "disconnected"
        }
    };

    let cache_status = if state.cache.is_healthy().await {
        "connected"
    } else {
        "unavailable"
    };

    let status = if db_status == "connected" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "healthy" } else { "unhealthy" },
            "database": db_status,
            "cache": cache_status,
            "cacheProvider": state.cache.provider_name(),
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
