//! Applies asynchronous registry callbacks to the domain
//!
//! The registry posts an operation outcome to the callback URL registered
//! at dispatch time, addressed by (application, request type). Business
//! failures are acknowledged without any state change: the inbound
//! protocol requires an immediate acknowledgement for every well-formed
//! callback to keep the registry from retry-storming.

use std::str::FromStr;
use std::sync::Arc;

use casebridge_domain::{CaseStatus, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ports::{ApplicationRepository, AttachmentRepository, AuditLog, StatusLedger};
use crate::registry::request::RequestType;

/// Outcome reported by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Success,
    Failure,
}

impl FromStr for CallbackOutcome {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Success" => Ok(Self::Success),
            "Failure" => Ok(Self::Failure),
            other => Err(format!("unknown callback message: {other}")),
        }
    }
}

/// One per-record entry of an open-case callback.
#[derive(Debug, Clone)]
pub struct CallbackRecord {
    /// Hex content hash the registry computed for the fetched document.
    pub hash_value: String,
    /// Version-series identifier the registry assigned to the record.
    pub version_series_id: String,
}

/// Validated callback payload.
#[derive(Debug, Clone)]
pub struct CallbackPayload {
    pub outcome: CallbackOutcome,
    pub request_id: String,
    pub case_guid: Option<String>,
    pub case_id: Option<String>,
    pub records: Vec<CallbackRecord>,
}

/// Applies validated callbacks to the ledger and domain entities.
pub struct CallbackService {
    applications: Arc<dyn ApplicationRepository>,
    attachments: Arc<dyn AttachmentRepository>,
    ledger: Arc<dyn StatusLedger>,
    audit: Arc<dyn AuditLog>,
}

impl CallbackService {
    #[must_use]
    pub fn new(
        applications: Arc<dyn ApplicationRepository>,
        attachments: Arc<dyn AttachmentRepository>,
        ledger: Arc<dyn StatusLedger>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self { applications, attachments, ledger, audit }
    }

    /// Handle one well-formed callback.
    ///
    /// # Errors
    /// `NotFound` when the addressed application does not exist; local
    /// persistence failures otherwise. Business failures reported by the
    /// registry are not errors.
    pub async fn handle(
        &self,
        application_id: Uuid,
        request_type: RequestType,
        payload: &CallbackPayload,
    ) -> Result<()> {
        // Resolve first so an unknown application is rejected uniformly.
        let application = self.applications.get(application_id).await?;

        match payload.outcome {
            CallbackOutcome::Failure => {
                warn!(
                    application_id = %application_id,
                    application = %application.reference(),
                    request_id = %payload.request_id,
                    request_type = request_type.as_str(),
                    "registry reported failure; acknowledged without state change"
                );
                Ok(())
            }
            CallbackOutcome::Success => match request_type {
                RequestType::OpenCase => self.apply_case_opened(application_id, payload).await,
                RequestType::DeleteCase => {
                    self.ledger.append(application_id, CaseStatus::DeleteRequestReceived).await?;
                    self.audit
                        .record(
                            application_id,
                            request_type.as_str(),
                            &format!("case deletion confirmed (request {})", payload.request_id),
                        )
                        .await?;
                    info!(
                        application_id = %application_id,
                        request_id = %payload.request_id,
                        "delete request confirmed by registry"
                    );
                    Ok(())
                }
                other => {
                    // Remaining variants progress through later callbacks
                    // or the decision pull; success here is ack-only.
                    debug!(
                        application_id = %application_id,
                        request_id = %payload.request_id,
                        request_type = other.as_str(),
                        "callback acknowledged"
                    );
                    Ok(())
                }
            },
        }
    }

    async fn apply_case_opened(
        &self,
        application_id: Uuid,
        payload: &CallbackPayload,
    ) -> Result<()> {
        self.applications
            .set_case_identifiers(
                application_id,
                payload.case_id.as_deref(),
                payload.case_guid.as_deref(),
            )
            .await?;

        let mut matched = 0usize;
        for attachment in self.attachments.for_application(application_id).await? {
            let record = payload
                .records
                .iter()
                .find(|record| record.hash_value.eq_ignore_ascii_case(&attachment.content_hash));
            if let Some(record) = record {
                self.attachments
                    .set_version_series_id(attachment.id, &record.version_series_id)
                    .await?;
                matched += 1;
            }
        }

        self.ledger.append(application_id, CaseStatus::CaseOpened).await?;
        self.audit
            .record(
                application_id,
                RequestType::OpenCase.as_str(),
                &format!("case opened in registry (request {})", payload.request_id),
            )
            .await?;

        info!(
            application_id = %application_id,
            request_id = %payload.request_id,
            case_id = payload.case_id.as_deref().unwrap_or(""),
            matched_records = matched,
            "case opened"
        );
        Ok(())
    }
}
