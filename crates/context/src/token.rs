//! Effective access state of one request

use http::header::COOKIE;
use http::HeaderMap;
use std::time::Duration;
use tracing::{debug, warn};
use warden_access::{parse_cookie_header, AccessGrantMap, Cookie, CookieName};
use warden_store::SessionStore;

/// Grants presented by a client, reconciled with its server-side session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessToken {
    /// Server-side session id; `None` in cookie-only mode
    pub session_id: Option<String>,
    pub client_ip: Option<String>,
    pub grants: AccessGrantMap,
}

impl AccessToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a token from `(name, value)` cookie pairs
    ///
    /// An empty `session` cookie means no session. Names that are neither
    /// `session` nor `<type>-<resource>` are skipped.
    pub fn from_cookies<'a>(cookies: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut token = Self::new();
        for (name, value) in cookies {
            match CookieName::parse(name) {
                Ok(CookieName::Session) => {
                    token.session_id = (!value.is_empty()).then(|| value.to_string());
                }
                Ok(CookieName::Grant {
                    access_type,
                    resource,
                }) => token.grants.add(access_type, resource, value),
                Err(e) => debug!(cookie = %name, error = %e, "skipping cookie"),
            }
        }
        token
    }

    /// Build a token from every `Cookie` header of a request
    pub fn request_cookies(headers: &HeaderMap) -> Self {
        Self::from_cookies(
            headers
                .get_all(COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .flat_map(parse_cookie_header),
        )
    }

    /// Build the token of a request, merging in the session record if any
    ///
    /// Store failures are logged and leave the token with its cookie grants.
    pub async fn from_request(
        headers: &HeaderMap,
        client_ip: &str,
        store: Option<&SessionStore>,
    ) -> Self {
        let mut token = Self::request_cookies(headers);
        token.client_ip = Some(client_ip.to_string());

        if let (Some(store), Some(session_id)) = (store, token.session_id.as_deref()) {
            match store.get_access_token(session_id, client_ip).await {
                Ok(record) => token.grants.merge(&record.access),
                Err(e) => warn!(
                    session_id = %session_id,
                    client_ip = %client_ip,
                    error = %e,
                    "session lookup failed, using cookie grants only"
                ),
            }
        }
        token
    }

    pub fn has_session(&self) -> bool {
        self.session_id.is_some()
    }

    /// The `session` cookie, if this token has a session
    pub fn session_cookie(&self, expiration: Duration) -> Option<Cookie> {
        self.session_id
            .as_deref()
            .map(|id| Cookie::session(id, expiration))
    }

    /// Cookies to send back: the session cookie alone, or one per grant
    pub fn response_cookies(&self, expiration: Duration) -> Vec<Cookie> {
        match self.session_cookie(expiration) {
            Some(cookie) => vec![cookie],
            None => self.grants.to_cookies(expiration),
        }
    }
}
