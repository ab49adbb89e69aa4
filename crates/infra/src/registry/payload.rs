//! Minimal outbound payload assembly.
//!
//! Full document rendering (PDF/XML content) is owned by an external
//! collaborator; this builder assembles the envelope the registry needs to
//! address a request and fetch the attached documents itself, referencing
//! each attachment by its access-controlled download URL.

use std::sync::Arc;

use async_trait::async_trait;
use casebridge_core::{AttachmentRepository, OutboundRequest, PayloadBuilder};
use casebridge_domain::Result;
use serde_json::{json, Value};

/// Assembles case request envelopes with attachment download links.
pub struct CasePayloadBuilder {
    attachments: Arc<dyn AttachmentRepository>,
    public_base_url: String,
}

impl CasePayloadBuilder {
    pub fn new(attachments: Arc<dyn AttachmentRepository>, public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Self { attachments, public_base_url }
    }
}

#[async_trait]
impl PayloadBuilder for CasePayloadBuilder {
    async fn build(&self, request: &OutboundRequest) -> Result<Value> {
        let application = request.application();

        let records: Vec<Value> = self
            .attachments
            .for_application(application.id)
            .await?
            .iter()
            .map(|attachment| {
                json!({
                    "fileName": attachment.file_name,
                    "contentType": attachment.content_type,
                    "hashValue": attachment.content_hash,
                    "downloadUrl": format!(
                        "{}/attachments/{}",
                        self.public_base_url, attachment.id
                    ),
                })
            })
            .collect();

        Ok(json!({
            "applicationNumber": application.application_number,
            "handler": application.handler_username,
            "requestType": request.request_type().as_str(),
            "records": records,
        }))
    }
}
