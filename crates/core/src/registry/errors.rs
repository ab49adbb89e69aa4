//! Typed errors for the token and dispatch paths
//!
//! Token errors are fatal for a whole batch run; dispatch errors are
//! per-item and leave the item for re-selection on the next run.

use casebridge_domain::BridgeError;
use thiserror::Error;

/// Token acquisition and refresh failures.
#[derive(Debug, Error)]
pub enum TokenError {
    /// No token row exists yet; initial provisioning has not happened.
    #[error("no registry token configured")]
    NotConfigured,

    /// The stored token's expiry has passed.
    #[error("stored registry token has expired")]
    Expired,

    /// The token endpoint answered with a non-success status.
    #[error("token endpoint returned HTTP {status}: {body}")]
    Retrieval { status: u16, body: String },

    /// The token endpoint could not be reached or answered garbage.
    #[error("token endpoint unreachable: {0}")]
    Endpoint(String),

    /// The single-slot store failed.
    #[error("token store failure: {0}")]
    Store(#[from] BridgeError),
}

/// Precondition violations detected before any HTTP call is issued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("application has no registry case id")]
    MissingCaseId,

    #[error("application has no handler identity")]
    MissingHandler,
}

/// Per-item dispatch failures.
///
/// Replaces the none-tuple sentinel of the source system with an explicit
/// result type so call sites pattern-match instead of null-checking.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("request preconditions not met: {0}")]
    Precondition(#[from] PreconditionError),

    /// The registry answered with a non-success status.
    #[error("registry returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Timeout, connection failure, or payload assembly failure.
    #[error("transport failure: {0}")]
    Transport(String),
}
