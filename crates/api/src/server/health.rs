//! Liveness and database health.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::context::AppContext;

pub async fn health(State(ctx): State<Arc<AppContext>>) -> Response {
    let db = ctx.db.clone();
    let healthy = tokio::task::spawn_blocking(move || db.health_check()).await;

    match healthy {
        Ok(Ok(())) => (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response(),
        _ => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded" })),
        )
            .into_response(),
    }
}
