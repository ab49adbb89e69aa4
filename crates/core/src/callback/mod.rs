//! Inbound registry callback handling

pub mod service;

pub use service::{CallbackOutcome, CallbackPayload, CallbackRecord, CallbackService};
