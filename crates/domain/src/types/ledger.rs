//! Append-only integration ledger
//!
//! Each application accumulates an immutable, ordered sequence of
//! [`StatusEvent`]s; the "current state" is a projection over the latest
//! event. The ledger is descriptive: it records whatever transition
//! actually happened and enforces no transition table.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Integration progress of one application against the registry.
///
/// Normal lifecycle:
/// `submitted_but_not_sent → request_to_open_case_sent → case_opened →
/// decision_proposal_sent → decision_proposal_accepted →
/// update_request_sent → signed_in_registry →
/// details_received_from_registry` (terminal).
///
/// Parallel cancellation branch:
/// `case_opened → delete_request_sent → delete_request_received`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    SubmittedButNotSent,
    RequestToOpenCaseSent,
    CaseOpened,
    DecisionProposalSent,
    DecisionProposalAccepted,
    UpdateRequestSent,
    SignedInRegistry,
    DetailsReceivedFromRegistry,
    DeleteRequestSent,
    DeleteRequestReceived,
}

impl CaseStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmittedButNotSent => "submitted_but_not_sent",
            Self::RequestToOpenCaseSent => "request_to_open_case_sent",
            Self::CaseOpened => "case_opened",
            Self::DecisionProposalSent => "decision_proposal_sent",
            Self::DecisionProposalAccepted => "decision_proposal_accepted",
            Self::UpdateRequestSent => "update_request_sent",
            Self::SignedInRegistry => "signed_in_registry",
            Self::DetailsReceivedFromRegistry => "details_received_from_registry",
            Self::DeleteRequestSent => "delete_request_sent",
            Self::DeleteRequestReceived => "delete_request_received",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted_but_not_sent" => Ok(Self::SubmittedButNotSent),
            "request_to_open_case_sent" => Ok(Self::RequestToOpenCaseSent),
            "case_opened" => Ok(Self::CaseOpened),
            "decision_proposal_sent" => Ok(Self::DecisionProposalSent),
            "decision_proposal_accepted" => Ok(Self::DecisionProposalAccepted),
            "update_request_sent" => Ok(Self::UpdateRequestSent),
            "signed_in_registry" => Ok(Self::SignedInRegistry),
            "details_received_from_registry" => Ok(Self::DetailsReceivedFromRegistry),
            "delete_request_sent" => Ok(Self::DeleteRequestSent),
            "delete_request_received" => Ok(Self::DeleteRequestReceived),
            other => Err(format!("unknown case status: {other}")),
        }
    }
}

/// One appended ledger entry. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Monotonic row id; tiebreaker for events sharing a timestamp.
    pub id: i64,
    pub application_id: Uuid,
    pub status: CaseStatus,
    pub created_at: DateTime<Utc>,
}
