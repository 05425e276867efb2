//! Domain Errors
//!
//! Raised by repositories; converted into `GatewayError` when a call leaves
//! the local gateway.

use serde::{Deserialize, Serialize};
use taskdeck::GatewayError;

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DomainError::Conflict(e.to_string())
            }
            _ => DomainError::Internal(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::InvalidInput(e.to_string())
    }
}

impl From<DomainError> for GatewayError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound(msg) => GatewayError::NotFound(msg),
            DomainError::InvalidInput(msg) | DomainError::Conflict(msg) => GatewayError::Validation(msg),
            DomainError::Unauthorized(msg) => GatewayError::Auth(msg),
            DomainError::Internal(msg) => GatewayError::Transport(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_mapping() {
        assert_eq!(
            GatewayError::from(DomainError::NotFound("tasks t-1".into())),
            GatewayError::NotFound("tasks t-1".into())
        );
        assert!(matches!(
            GatewayError::from(DomainError::Conflict("email taken".into())),
            GatewayError::Validation(_)
        ));
        assert!(matches!(
            GatewayError::from(DomainError::Unauthorized("bad password".into())),
            GatewayError::Auth(_)
        ));
        assert!(matches!(
            GatewayError::from(DomainError::Internal("disk I/O".into())),
            GatewayError::Transport(_)
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(DomainError::InvalidInput("x".into()).to_string(), "Invalid input: x");
    }
}
