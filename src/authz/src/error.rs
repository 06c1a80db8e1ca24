//! Error types for the authorization core

use thiserror::Error;

use crate::permission::PermissionError;

/// Authorization core errors
///
/// Queries never produce these: an unknown caller, role or group simply
/// answers `false`. Errors come from malformed permission literals, store
/// mutations that reference missing entities, and configuration loading.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Malformed permission literal
    #[error("Invalid permission: {0}")]
    InvalidPermission(#[from] PermissionError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Entity referenced by a mutation does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity already exists
    #[error("Duplicate entity: {0}")]
    DuplicateEntity(String),

    /// Parent assignment would make the group tree cyclic
    #[error("Cycle detected: {0}")]
    CycleDetected(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_error_conversion() {
        let err: AuthzError = PermissionError::EmptyDomain.into();
        assert!(matches!(err, AuthzError::InvalidPermission(PermissionError::EmptyDomain)));
        assert!(err.to_string().starts_with("Invalid permission:"));
    }

    #[test]
    fn test_display() {
        let err = AuthzError::NotFound("caller 'joe'".to_string());
        assert_eq!(err.to_string(), "Not found: caller 'joe'");
    }
}
