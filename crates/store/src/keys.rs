//! Store key namespaces

use warden_core::{CACHE_NAMESPACE, RATE_NAMESPACE, SESSION_NAMESPACE};

/// Builds prefixed keys so several deployments can share one store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn cache(&self, key: &str) -> String {
        format!("{}-{CACHE_NAMESPACE}:{key}", self.prefix)
    }

    pub fn rate(&self, request_type: &str, client_id: &str) -> String {
        format!("{}-{RATE_NAMESPACE}:{request_type}:{client_id}", self.prefix)
    }

    pub fn session(&self, session_id: &str) -> String {
        format!("{}-{SESSION_NAMESPACE}:{session_id}", self.prefix)
    }
}
