//! Domain types and models

pub mod application;
pub mod audit;
pub mod decision;
pub mod ledger;
pub mod token;

pub use application::{Application, ApplicationBatch, ApplicationStatus, Attachment};
pub use audit::AuditEntry;
pub use decision::{DecisionDetails, InstallmentStatus, PaymentInstallment};
pub use ledger::{CaseStatus, StatusEvent};
pub use token::RegistryToken;
