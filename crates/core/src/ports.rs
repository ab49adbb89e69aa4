//! Port interfaces implemented by the infrastructure layer

use async_trait::async_trait;
use casebridge_domain::{
    Application, Attachment, CaseStatus, DecisionDetails, RegistryToken, Result, StatusEvent,
};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::dispatch::BatchOperation;
use crate::registry::errors::{DispatchError, TokenError};
use crate::registry::request::{DispatchReceipt, OutboundRequest};

/// Application persistence as touched by the integration.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Select candidate applications for one batch operation, applying the
    /// operation's status predicate against the latest ledger event.
    async fn find_candidates(
        &self,
        operation: BatchOperation,
        limit: usize,
    ) -> Result<Vec<Application>>;

    /// Fetch one application by id.
    async fn get(&self, id: Uuid) -> Result<Application>;

    /// Store the registry case GUID obtained from a dispatch response.
    async fn set_case_guid(&self, id: Uuid, case_guid: &str) -> Result<()>;

    /// Store the case identifiers reported by an inbound callback.
    async fn set_case_identifiers(
        &self,
        id: Uuid,
        case_id: Option<&str>,
        case_guid: Option<&str>,
    ) -> Result<()>;
}

/// Attachment persistence.
#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    /// All attachments of one application.
    async fn for_application(&self, application_id: Uuid) -> Result<Vec<Attachment>>;

    /// Fetch one attachment by id.
    async fn get(&self, id: Uuid) -> Result<Option<Attachment>>;

    /// Store the registry's version-series identifier on an attachment.
    async fn set_version_series_id(&self, id: Uuid, version_series_id: &str) -> Result<()>;
}

/// Append-only status ledger.
///
/// `append` records whatever transition actually happened; there is no
/// transition-table validation, and events are never mutated or deleted.
#[async_trait]
pub trait StatusLedger: Send + Sync {
    /// Append one status event, stamped at insertion time.
    async fn append(&self, application_id: Uuid, status: CaseStatus) -> Result<()>;

    /// Current status: the event with the latest timestamp, if any.
    async fn current(&self, application_id: Uuid) -> Result<Option<CaseStatus>>;

    /// Full event history, oldest first.
    async fn history(&self, application_id: Uuid) -> Result<Vec<StatusEvent>>;
}

/// Decision batch persistence.
#[async_trait]
pub trait BatchRepository: Send + Sync {
    /// Write extracted decision fields onto the owning batch.
    async fn record_decision(&self, batch_id: Uuid, details: &DecisionDetails) -> Result<()>;
}

/// Staged payment installments.
#[async_trait]
pub trait InstallmentRepository: Send + Sync {
    /// Promote pending installments due on or before `today` to accepted.
    /// Returns the number of promoted rows.
    async fn promote_due_pending(&self, application_id: Uuid, today: NaiveDate) -> Result<u64>;
}

/// Audit trail for externally triggered state changes.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, application_id: Uuid, operation: &str, message: &str) -> Result<()>;
}

/// Single-slot store holding the one active registry token.
///
/// Constructed once per process and passed by reference; `put` replaces the
/// stored row atomically so expiry is never computed against a stale
/// predecessor.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self) -> Result<Option<RegistryToken>>;

    async fn put(&self, token: &RegistryToken) -> Result<()>;
}

/// Token acquisition for a batch run.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// The stored token, failing when none exists or it has expired.
    /// Failure here is fatal for an entire run.
    async fn get_current(&self) -> std::result::Result<RegistryToken, TokenError>;

    /// Exchange the stored refresh token for a fresh token and replace the
    /// stored row.
    async fn refresh(&self) -> std::result::Result<RegistryToken, TokenError>;
}

/// Outbound gateway to the case registry.
#[async_trait]
pub trait RegistryGateway: Send + Sync {
    /// Execute one typed request under the run's token. One HTTP call,
    /// fixed timeout, no retries.
    async fn send(
        &self,
        request: &OutboundRequest,
        token: &RegistryToken,
    ) -> std::result::Result<DispatchReceipt, DispatchError>;

    /// Synchronously pull the decision payloads published for a case.
    async fn fetch_decisions(
        &self,
        case_id: &str,
        token: &RegistryToken,
    ) -> std::result::Result<Vec<serde_json::Value>, DispatchError>;
}

/// Assembles the outbound JSON body for a request.
///
/// Payload content itself (PDF/XML rendering) is owned by an external
/// collaborator; implementations reference attachments by download URL.
#[async_trait]
pub trait PayloadBuilder: Send + Sync {
    async fn build(&self, request: &OutboundRequest) -> Result<serde_json::Value>;
}
