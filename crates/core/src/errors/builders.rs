//! Builder methods for creating errors with context

use super::types::Error;
use std::time::Duration;

// Helper methods for creating errors with context
impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a network error
    #[must_use]
    pub fn network(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Network {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a not-found error for a store key
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Error::NotFound { key: key.into() }
    }

    /// Create a session IP mismatch error
    #[must_use]
    pub fn session_mismatch(
        session_id: impl Into<String>,
        expected_ip: impl Into<String>,
        actual_ip: impl Into<String>,
    ) -> Self {
        Error::SessionMismatch {
            session_id: session_id.into(),
            expected_ip: expected_ip.into(),
            actual_ip: actual_ip.into(),
        }
    }

    /// Create an invalid cookie name error
    #[must_use]
    pub fn invalid_cookie_name(name: impl Into<String>, reason: &'static str) -> Self {
        Error::InvalidCookieName {
            name: name.into(),
            reason,
        }
    }

    /// Create a store error
    #[must_use]
    pub fn store(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Store {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a store error with a source error
    #[must_use]
    pub fn store_with_source(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Store {
            operation: operation.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }
}
