//! Server-side session record

use serde::{Deserialize, Serialize};
use warden_access::AccessGrantMap;

/// Persisted form of an access token, keyed by session id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    /// Address the session was created from
    pub ip: String,
    #[serde(default)]
    pub access: AccessGrantMap,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ip: ip.into(),
            access: AccessGrantMap::new(),
        }
    }
}
