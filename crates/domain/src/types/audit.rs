//! Audit trail entries written by the callback receiver

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One audit row recording an externally triggered state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub application_id: Uuid,
    /// Operation identifier, e.g. `open_case` or `delete_case`.
    pub operation: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
