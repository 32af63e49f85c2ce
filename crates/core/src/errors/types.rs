//! Core error type definitions

use std::time::Duration;

/// Result type alias for warden operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for warden operations using thiserror
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration errors, fatal only at startup
    Configuration { message: String },

    /// Network-related errors talking to the backing store
    Network { endpoint: String, message: String },

    /// Operation exceeded its deadline
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// A key was absent from the store
    NotFound { key: String },

    /// JSON serialization/deserialization errors
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// A session was presented from a different IP than the one it was issued to
    SessionMismatch {
        session_id: String,
        expected_ip: String,
        actual_ip: String,
    },

    /// A cookie name that does not follow the `<type>-<resource>` layout
    InvalidCookieName { name: String, reason: &'static str },

    /// Any other failure reported by the backing store
    Store {
        operation: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Whether the error comes from the store or the network and should
    /// degrade the request instead of failing it
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Network { .. }
                | Error::Timeout { .. }
                | Error::NotFound { .. }
                | Error::Json { .. }
                | Error::Store { .. }
        )
    }

    /// Whether a cache lookup failed because the entry is missing or unreadable
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, Error::NotFound { .. } | Error::Json { .. })
    }
}
