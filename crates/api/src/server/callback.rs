//! Registry callback receiver.
//!
//! `POST /cases/{application_id}/callback/{request_type}`, the URL the
//! registry was handed in `X-CallbackURL` at dispatch time. Shape
//! validation happens here; a malformed payload is rejected with field
//! errors and changes nothing. Well-formed callbacks are always
//! acknowledged with 200, business failure included.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use casebridge_core::{CallbackOutcome, CallbackPayload, CallbackRecord, RequestType};
use casebridge_domain::BridgeError;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::error;
use uuid::Uuid;

use crate::context::AppContext;

/// Raw callback body; validated field by field so every shape problem is
/// reported instead of a bare deserialisation failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackBody {
    message: Option<String>,
    request_id: Option<String>,
    case_guid: Option<String>,
    case_id: Option<String>,
    #[serde(default)]
    records: Vec<CallbackBodyRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackBodyRecord {
    hash_value: Option<String>,
    version_series_id: Option<String>,
}

pub async fn receive_callback(
    State(ctx): State<Arc<AppContext>>,
    Path((application_id, request_type)): Path<(String, String)>,
    Json(body): Json<CallbackBody>,
) -> Response {
    let mut errors = Map::new();

    let application_id = match Uuid::parse_str(&application_id) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.insert("applicationId".into(), Value::String("must be a UUID".into()));
            None
        }
    };

    let request_type = match RequestType::from_callback_segment(&request_type) {
        Some(request_type) => Some(request_type),
        None => {
            errors.insert("requestType".into(), Value::String("unknown request type".into()));
            None
        }
    };

    let outcome = match body.message.as_deref().map(str::parse::<CallbackOutcome>) {
        Some(Ok(outcome)) => Some(outcome),
        _ => {
            errors.insert(
                "message".into(),
                Value::String("must be \"Success\" or \"Failure\"".into()),
            );
            None
        }
    };

    let request_id = match body.request_id.filter(|id| !id.is_empty()) {
        Some(id) => Some(id),
        None => {
            errors.insert("requestId".into(), Value::String("is required".into()));
            None
        }
    };

    let mut records = Vec::with_capacity(body.records.len());
    for record in body.records {
        match (record.hash_value, record.version_series_id) {
            (Some(hash_value), Some(version_series_id)) => {
                records.push(CallbackRecord { hash_value, version_series_id });
            }
            _ => {
                errors.insert(
                    "records".into(),
                    Value::String("hashValue and versionSeriesId are required".into()),
                );
            }
        }
    }

    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response();
    }

    let (Some(application_id), Some(request_type), Some(outcome), Some(request_id)) =
        (application_id, request_type, outcome, request_id)
    else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let payload = CallbackPayload {
        outcome,
        request_id,
        case_guid: body.case_guid,
        case_id: body.case_id,
        records,
    };

    match ctx.callbacks.handle(application_id, request_type, &payload).await {
        Ok(()) => {
            (StatusCode::OK, Json(json!({ "message": "Callback received" }))).into_response()
        }
        Err(BridgeError::NotFound(message)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "errors": { "applicationId": message } })),
        )
            .into_response(),
        Err(err) => {
            error!(
                application_id = %application_id,
                request_type = request_type.as_str(),
                error = %err,
                "callback processing failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "errors": { "internal": "callback processing failed" } })),
            )
                .into_response()
        }
    }
}
