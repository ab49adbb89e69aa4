//! # Casebridge Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits)
//! - The outbound request model
//! - Use cases: batch dispatch, callback application, decision extraction
//!
//! ## Architecture Principles
//! - Only depends on `casebridge-domain`
//! - No database or HTTP code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod callback;
pub mod decision;
pub mod dispatch;
pub mod ports;
pub mod registry;

// Re-export specific items to avoid ambiguity
pub use callback::{CallbackOutcome, CallbackPayload, CallbackRecord, CallbackService};
pub use decision::extractor::{extract_decision_details, DecisionDetailsError};
pub use decision::DecisionService;
pub use dispatch::{BatchOperation, DispatchService, RunSummary};
pub use ports::{
    ApplicationRepository, AttachmentRepository, AuditLog, BatchRepository,
    InstallmentRepository, PayloadBuilder, RegistryGateway, StatusLedger, TokenProvider,
    TokenStore,
};
pub use registry::errors::{DispatchError, PreconditionError, TokenError};
pub use registry::request::{DispatchReceipt, HttpMethod, OutboundRequest, RequestType};
