//! Attachment download endpoint.
//!
//! `GET /attachments/{id}` serves the stored content so the registry can
//! fetch documents referenced in outbound payloads. Access requires the
//! configured download token; without one configured the endpoint denies
//! everything.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use casebridge_core::AttachmentRepository;
use tracing::warn;
use uuid::Uuid;

use crate::context::AppContext;

pub async fn download_attachment(
    State(ctx): State<Arc<AppContext>>,
    Path(attachment_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !is_authorized(&headers, &ctx.config.server.download_token) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let Ok(attachment_id) = Uuid::parse_str(&attachment_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let attachment = match ctx.attachments.get(attachment_id).await {
        Ok(Some(attachment)) => attachment,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            warn!(attachment_id = %attachment_id, error = %err, "attachment lookup failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let content = match tokio::fs::read(&attachment.path).await {
        Ok(content) => content,
        Err(err) => {
            warn!(
                attachment_id = %attachment_id,
                path = %attachment.path,
                error = %err,
                "attachment content unreadable"
            );
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let disposition = format!("attachment; filename=\"{}\"", attachment.file_name);
    (
        [
            (header::CONTENT_TYPE, attachment.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(content),
    )
        .into_response()
}

fn is_authorized(headers: &HeaderMap, expected_token: &str) -> bool {
    if expected_token.is_empty() {
        return false;
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|presented| presented == expected_token)
}
