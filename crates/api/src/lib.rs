//! # Casebridge API
//!
//! HTTP surface and process wiring:
//! - the inbound callback receiver and attachment download endpoints
//! - the application context assembling repositories and services
//! - logging initialisation shared by the binaries

pub mod context;
pub mod logging;
pub mod server;

pub use context::AppContext;
