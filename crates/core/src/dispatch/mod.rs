//! Scheduled batch dispatch against the registry

pub mod service;

pub use service::{BatchOperation, DispatchService, RunSummary};
