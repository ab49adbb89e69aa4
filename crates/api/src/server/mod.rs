//! Inbound HTTP surface.

pub mod attachments;
pub mod callback;
pub mod health;

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use casebridge_domain::{BridgeError, Result};
use tokio::net::TcpListener;
use tracing::info;

use crate::context::AppContext;

/// Build the router over the shared context.
pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/cases/{application_id}/callback/{request_type}",
            post(callback::receive_callback),
        )
        .route("/attachments/{attachment_id}", get(attachments::download_attachment))
        .with_state(ctx)
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve(
    ctx: Arc<AppContext>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let bind_addr = ctx.config.server.bind_addr.clone();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| BridgeError::Network(format!("failed to bind {bind_addr}: {err}")))?;

    info!(addr = %bind_addr, "callback server listening");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|err| BridgeError::Network(format!("server error: {err}")))
}
