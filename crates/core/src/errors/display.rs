//! Display implementations for error types

use super::types::Error;
use std::fmt;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration { message } => {
                write!(f, "configuration error: {message}")
            }
            Error::Network { endpoint, message } => {
                write!(f, "network error for '{endpoint}': {message}")
            }
            Error::Timeout {
                operation,
                duration,
            } => {
                write!(f, "operation '{operation}' timed out after {duration:?}")
            }
            Error::NotFound { key } => {
                write!(f, "key '{key}' not found")
            }
            Error::Json { message, .. } => {
                write!(f, "JSON error: {message}")
            }
            Error::SessionMismatch {
                session_id,
                expected_ip,
                actual_ip,
            } => {
                write!(
                    f,
                    "session '{session_id}' belongs to {expected_ip}, presented by {actual_ip}"
                )
            }
            Error::InvalidCookieName { name, reason } => {
                write!(f, "invalid access cookie name '{name}': {reason}")
            }
            Error::Store {
                operation, message, ..
            } => {
                write!(f, "store operation '{operation}' failed: {message}")
            }
        }
    }
}
