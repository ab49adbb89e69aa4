//! Decision detail extraction and application

pub mod extractor;
pub mod service;

pub use service::DecisionService;
