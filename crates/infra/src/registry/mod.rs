//! Registry integration: token upkeep, outbound gateway, payloads.

pub mod client;
pub mod payload;
pub mod token;

pub use client::RegistryClient;
pub use payload::CasePayloadBuilder;
pub use token::TokenManager;
