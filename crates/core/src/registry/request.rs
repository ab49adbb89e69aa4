//! Typed outbound registry operations
//!
//! One variant per registry action. Each variant fixes its HTTP method and
//! the ledger status recorded on success, and may impose preconditions
//! before a target URL can be built. Requests are transient: constructed
//! fresh for one dispatch call and dropped.

use std::fmt;

use casebridge_domain::{Application, CaseStatus};
use url::Url;

use super::errors::PreconditionError;

/// Reason sent to the registry when a cancelled application's case is
/// deleted.
const DELETE_REASON: &str = "application cancelled in the benefit system";

/// HTTP method of an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five typed write operations against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    OpenCase,
    DecisionProposal,
    UpdateRecords,
    AddRecords,
    DeleteCase,
}

impl RequestType {
    /// Wire name used in callback URLs and the operator CLI.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenCase => "open_case",
            Self::DecisionProposal => "send_decision_proposal",
            Self::UpdateRecords => "update_application",
            Self::AddRecords => "add_records",
            Self::DeleteCase => "delete_case",
        }
    }

    /// Parse a callback URL segment back into a request type.
    #[must_use]
    pub fn from_callback_segment(segment: &str) -> Option<Self> {
        match segment {
            "open_case" => Some(Self::OpenCase),
            "send_decision_proposal" => Some(Self::DecisionProposal),
            "update_application" => Some(Self::UpdateRecords),
            "add_records" => Some(Self::AddRecords),
            "delete_case" => Some(Self::DeleteCase),
            _ => None,
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful dispatch acknowledgement.
#[derive(Debug, Clone)]
pub struct DispatchReceipt {
    /// Correlation id parsed from the response body, or generated when the
    /// body carried none.
    pub correlation_id: String,
}

/// One outbound request, bound to the application it concerns.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    application: Application,
    request_type: RequestType,
    /// Actor recorded on case deletion; defaults to the handler identity.
    actor: Option<String>,
    /// Deletion reason forwarded to the registry.
    reason: Option<String>,
}

impl OutboundRequest {
    #[must_use]
    pub fn new(application: Application, request_type: RequestType) -> Self {
        let (actor, reason) = if request_type == RequestType::DeleteCase {
            (application.handler_username.clone(), Some(DELETE_REASON.to_string()))
        } else {
            (None, None)
        };
        Self { application, request_type, actor, reason }
    }

    #[must_use]
    pub fn application(&self) -> &Application {
        &self.application
    }

    #[must_use]
    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    /// Fixed HTTP method of this variant.
    #[must_use]
    pub fn http_method(&self) -> HttpMethod {
        match self.request_type {
            RequestType::OpenCase | RequestType::DecisionProposal | RequestType::AddRecords => {
                HttpMethod::Post
            }
            RequestType::UpdateRecords => HttpMethod::Put,
            RequestType::DeleteCase => HttpMethod::Delete,
        }
    }

    /// Ledger status appended after a successful dispatch.
    ///
    /// `AddRecords` is acknowledge-only: its effect is observed through the
    /// callback assigning version-series ids, so no event is recorded.
    #[must_use]
    pub fn result_status(&self) -> Option<CaseStatus> {
        match self.request_type {
            RequestType::OpenCase => Some(CaseStatus::RequestToOpenCaseSent),
            RequestType::DecisionProposal => Some(CaseStatus::DecisionProposalSent),
            RequestType::UpdateRecords => Some(CaseStatus::UpdateRequestSent),
            RequestType::AddRecords => None,
            RequestType::DeleteCase => Some(CaseStatus::DeleteRequestSent),
        }
    }

    /// Verify the application carries the fields this variant addresses.
    ///
    /// Opening a case requires the handler identity; every other variant
    /// additionally requires the registry case id.
    ///
    /// # Errors
    /// Returns the first violated precondition. No HTTP call may be issued
    /// after a violation.
    pub fn check_preconditions(&self) -> Result<(), PreconditionError> {
        if self.application.handler_username.as_deref().map_or(true, str::is_empty) {
            return Err(PreconditionError::MissingHandler);
        }
        if self.request_type != RequestType::OpenCase
            && self.application.case_id.as_deref().map_or(true, str::is_empty)
        {
            return Err(PreconditionError::MissingCaseId);
        }
        Ok(())
    }

    /// Build the target URL for this request.
    ///
    /// Base is `{registry}/cases`. `OpenCase` posts to the base directly;
    /// the record variants target `{base}/{case_id}/records`; `DeleteCase`
    /// drops the `/records` suffix and appends actor and reason as query
    /// parameters.
    ///
    /// # Errors
    /// Returns a precondition error when a required field is missing.
    pub fn build_url(&self, registry_base: &str) -> Result<String, PreconditionError> {
        self.check_preconditions()?;

        let base = format!("{}/cases", registry_base.trim_end_matches('/'));
        match self.request_type {
            RequestType::OpenCase => Ok(base),
            RequestType::DecisionProposal
            | RequestType::UpdateRecords
            | RequestType::AddRecords => {
                let case_id = self.case_id()?;
                Ok(format!("{base}/{case_id}/records"))
            }
            RequestType::DeleteCase => {
                let case_id = self.case_id()?;
                let actor = self.actor.clone().unwrap_or_default();
                let reason = self.reason.clone().unwrap_or_default();
                let url = Url::parse_with_params(
                    &format!("{base}/{case_id}"),
                    &[("actor", actor.as_str()), ("reason", reason.as_str())],
                )
                .map_err(|_| PreconditionError::MissingCaseId)?;
                Ok(url.to_string())
            }
        }
    }

    fn case_id(&self) -> Result<&str, PreconditionError> {
        self.application
            .case_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(PreconditionError::MissingCaseId)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the outbound request model.
    use casebridge_domain::ApplicationStatus;
    use uuid::Uuid;

    use super::*;

    fn application(case_id: Option<&str>, handler: Option<&str>) -> Application {
        Application {
            id: Uuid::new_v4(),
            application_number: "HEL-2024-000123".to_string(),
            status: ApplicationStatus::Handling,
            case_id: case_id.map(str::to_string),
            case_guid: None,
            handler_username: handler.map(str::to_string),
            batch_id: None,
        }
    }

    #[test]
    fn open_case_targets_the_cases_base() {
        let request = OutboundRequest::new(application(None, Some("handler")), RequestType::OpenCase);
        let url = request.build_url("https://registry.example.com").expect("url builds");
        assert_eq!(url, "https://registry.example.com/cases");
    }

    #[test]
    fn record_variants_target_the_case_records_path() {
        for (request_type, method) in [
            (RequestType::DecisionProposal, HttpMethod::Post),
            (RequestType::UpdateRecords, HttpMethod::Put),
            (RequestType::AddRecords, HttpMethod::Post),
        ] {
            let request =
                OutboundRequest::new(application(Some("HEL-2024-1"), Some("handler")), request_type);
            let url = request.build_url("https://registry.example.com/").expect("url builds");
            assert_eq!(url, "https://registry.example.com/cases/HEL-2024-1/records");
            assert_eq!(request.http_method(), method);
        }
    }

    #[test]
    fn delete_case_strips_records_and_appends_query_parameters() {
        let request = OutboundRequest::new(
            application(Some("HEL-1"), Some("handler")),
            RequestType::DeleteCase,
        );
        let url = request.build_url("https://registry.example.com").expect("url builds");

        assert!(url.starts_with("https://registry.example.com/cases/HEL-1?"));
        assert!(!url.contains("/records"));
        assert!(url.contains("actor=handler"));
        assert!(url.contains("reason="));
    }

    /// Calling a variant's URL builder without a required case id must
    /// raise the case-id-missing error so that no HTTP call is issued.
    #[test]
    fn missing_case_id_is_rejected_before_any_call() {
        for request_type in [
            RequestType::DecisionProposal,
            RequestType::UpdateRecords,
            RequestType::AddRecords,
            RequestType::DeleteCase,
        ] {
            let request = OutboundRequest::new(application(None, Some("handler")), request_type);
            assert_eq!(
                request.build_url("https://registry.example.com"),
                Err(PreconditionError::MissingCaseId),
            );
        }
    }

    #[test]
    fn missing_handler_is_rejected_for_every_variant() {
        for request_type in [
            RequestType::OpenCase,
            RequestType::DecisionProposal,
            RequestType::UpdateRecords,
            RequestType::AddRecords,
            RequestType::DeleteCase,
        ] {
            let request = OutboundRequest::new(application(Some("HEL-1"), None), request_type);
            assert_eq!(request.check_preconditions(), Err(PreconditionError::MissingHandler));
        }
    }

    #[test]
    fn add_records_is_acknowledge_only() {
        let request =
            OutboundRequest::new(application(Some("HEL-1"), Some("handler")), RequestType::AddRecords);
        assert_eq!(request.result_status(), None);
    }

    #[test]
    fn callback_segments_round_trip() {
        for request_type in [
            RequestType::OpenCase,
            RequestType::DecisionProposal,
            RequestType::UpdateRecords,
            RequestType::AddRecords,
            RequestType::DeleteCase,
        ] {
            assert_eq!(RequestType::from_callback_segment(request_type.as_str()), Some(request_type));
        }
        assert_eq!(RequestType::from_callback_segment("close_case"), None);
    }
}
