//! Decision details and staged payment installments

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Structured decision fields extracted from a registry decision payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecisionDetails {
    pub decision_maker_name: String,
    pub decision_maker_title: String,
    /// Literal section-of-law field with the trailing section symbol.
    pub section_of_law: String,
    pub decision_date: DateTime<Utc>,
}

/// Payment installment state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Pending,
    Accepted,
    Paid,
}

impl InstallmentStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "paid" => Ok(Self::Paid),
            other => Err(format!("unknown installment status: {other}")),
        }
    }
}

/// One staged payment installment of a granted benefit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInstallment {
    pub id: Uuid,
    pub application_id: Uuid,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
}
