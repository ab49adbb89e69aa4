//! Benefit application entities as seen by the integration layer
//!
//! Applications, their batches, and attachments are owned by the
//! surrounding backend; only the fields this integration reads or writes
//! are modeled here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Processing status of a benefit application in the owning backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Received,
    Handling,
    Accepted,
    Rejected,
    Cancelled,
}

impl ApplicationStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Handling => "handling",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(Self::Received),
            "handling" => Ok(Self::Handling),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown application status: {other}")),
        }
    }
}

/// Benefit application, restricted to the fields this integration touches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub application_number: String,
    pub status: ApplicationStatus,
    /// Human-readable case identifier assigned by the registry.
    pub case_id: Option<String>,
    /// Registry-internal case GUID.
    pub case_guid: Option<String>,
    /// Registry-facing username of the case handler. Required before most
    /// requests can be addressed.
    pub handler_username: Option<String>,
    /// Owning decision batch, when the application has been decided.
    pub batch_id: Option<Uuid>,
}

impl Application {
    /// Short display reference used in log lines.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.application_number
    }
}

/// Decision batch owning a set of handled applications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationBatch {
    pub id: Uuid,
    pub status: String,
    pub decision_maker_name: Option<String>,
    pub decision_maker_title: Option<String>,
    pub section_of_law: Option<String>,
    pub decision_date: Option<chrono::DateTime<chrono::Utc>>,
}

/// Document attached to an application.
///
/// `version_series_id` is assigned by the registry and stored once an
/// inbound callback reports a record whose content hash matches
/// `content_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub application_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    /// Filesystem path of the stored content.
    pub path: String,
    /// Hex-encoded SHA-256 of the content, computed at upload time.
    pub content_hash: String,
    pub version_series_id: Option<String>,
}
