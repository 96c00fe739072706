use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Extension, Json, Router};
use serde_json::json;

use crate::{error::HttpError, AppState};

pub fn health_handler() -> Router {
    Router::new().route("/database", get(database_health))
}

pub async fn liveness() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub async fn database_health(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    app_state.db_client.ping().await.map_err(|e| {
        tracing::error!("database health check failed: {}", e);
        HttpError::server_error("Database unavailable")
    })?;

    Ok(Json(json!({
        "status": "ok",
        "database": "connected"
    })))
}
