//! Error handling module
//!
//! Centralized error type for engine operations.

/// Engine-wide Result type
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    // Input-side errors
    #[error(transparent)]
    Domain(#[from] crate::domain::DomainError),

    // Store boundary errors
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    // Startup errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl EngineError {
    /// Check if re-subscribing could succeed where this operation
    /// failed
    pub fn is_resubscribable(&self) -> bool {
        matches!(self, EngineError::Store(e) if e.is_resubscribable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;
    use crate::store::StoreError;

    #[test]
    fn test_store_error_conversion() {
        let err: EngineError = StoreError::Unavailable("down".to_string()).into();
        assert!(err.is_resubscribable());
        assert!(err.to_string().contains("down"));
    }

    #[test]
    fn test_domain_error_is_transparent() {
        let err: EngineError = DomainError::InvalidParticipant("bad_id".to_string()).into();
        assert_eq!(err.to_string(), "Invalid chat participant id: bad_id");
        assert!(!err.is_resubscribable());
    }
}
