use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    /// Embedding provider unreachable, rejected credentials or exhausted quota
    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    /// Cache store unreadable, corrupt or failing on disk
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Invalid cache configuration detected at startup
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Timed out: {operation} after {millis}ms")]
    Timeout { operation: String, millis: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, millis: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            millis,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error is a startup misconfiguration rather than a transient failure
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error() {
        let error = DomainError::provider("openai", "quota exceeded");
        assert_eq!(error.to_string(), "Provider error: openai - quota exceeded");
    }

    #[test]
    fn test_storage_error() {
        let error = DomainError::storage("disk full");
        assert_eq!(error.to_string(), "Storage error: disk full");
    }

    #[test]
    fn test_timeout_error() {
        let error = DomainError::timeout("embedding", 250);
        assert_eq!(error.to_string(), "Timed out: embedding after 250ms");
    }

    #[test]
    fn test_is_configuration() {
        assert!(DomainError::configuration("bad threshold").is_configuration());
        assert!(!DomainError::storage("io").is_configuration());
    }
}
