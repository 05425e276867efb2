//! Gateway Errors
//!
//! Failure taxonomy for every call that crosses the remote data boundary.
//! Stores catch these and keep the message in their `error` slot.

use serde::{Deserialize, Serialize};

/// Common result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by the remote data service (or raised before calling it)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum GatewayError {
    /// A mutating call was made with no signed-in account
    #[error("No user logged in")]
    NotAuthenticated,
    /// Network or service failure
    #[error("Transport error: {0}")]
    Transport(String),
    /// The service rejected the session or credentials
    #[error("Auth error: {0}")]
    Auth(String),
    /// The service rejected a malformed payload
    #[error("Validation error: {0}")]
    Validation(String),
    /// Mutation target is absent remotely
    #[error("Not found: {0}")]
    NotFound(String),
}
