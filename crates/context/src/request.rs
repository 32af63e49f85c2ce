//! Per-request access scope

use crate::context::RequestContext;
use crate::token::AccessToken;
use http::header::{SET_COOKIE, USER_AGENT};
use http::{HeaderMap, HeaderValue, Method, Request, Uri};
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn, Span};
use warden_access::{
    AccessCode, AccessGrantMap, AccessResourceName, AccessRevocationSet, AccessType, Cookie,
    RevokePolicy,
};
use warden_core::{Error, Result};
use warden_store::{SessionRecord, SessionStore};
use warden_utils::{new_request_id, new_session_id, request_span};

/// State of one incoming request
///
/// The access token is built on first use, so requests that never look at
/// access never touch the store.
pub struct PageRequest {
    context: Arc<RequestContext>,
    request_id: String,
    method: Method,
    uri: Uri,
    rel_path: String,
    headers: HeaderMap,
    client_ip: String,
    token: Option<AccessToken>,
    logged: AtomicBool,
}

impl PageRequest {
    /// Start handling `request` for the page mounted at `page_prefix`
    pub fn new<B>(
        context: Arc<RequestContext>,
        request: &Request<B>,
        page_prefix: &str,
        peer: Option<SocketAddr>,
    ) -> Self {
        let headers = request.headers().clone();
        let client_ip = context.client_ip(&headers, peer);
        let path = request.uri().path();
        Self {
            request_id: new_request_id(),
            method: request.method().clone(),
            uri: request.uri().clone(),
            rel_path: path.strip_prefix(page_prefix).unwrap_or(path).to_string(),
            headers,
            client_ip,
            token: None,
            logged: AtomicBool::new(false),
            context,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Request path relative to the page prefix
    pub fn rel_path(&self) -> &str {
        &self.rel_path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn client_ip(&self) -> &str {
        &self.client_ip
    }

    pub fn context(&self) -> &Arc<RequestContext> {
        &self.context
    }

    /// Span carrying the request id and client address
    pub fn span(&self) -> Span {
        request_span(&self.request_id, &self.client_ip)
    }

    /// Log a message tagged with the request id
    ///
    /// The first call also logs the request line.
    pub fn log(&self, message: impl Display) {
        if !self.logged.swap(true, Ordering::Relaxed) {
            self.log_request();
        }
        info!(request_id = %self.request_id, "{message}");
    }

    fn log_request(&self) {
        let user_agent = self
            .headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        let token = AccessToken::request_cookies(&self.headers);
        info!(
            request_id = %self.request_id,
            method = %self.method,
            uri = %self.uri,
            client_ip = %self.client_ip,
            user_agent = %user_agent,
            session = token.session_id.as_deref().unwrap_or(""),
            "request"
        );
    }

    /// The access token of this request, built on first use
    pub async fn access_token(&mut self) -> &mut AccessToken {
        let token = match self.token.take() {
            Some(token) => token,
            None => {
                let store = self.context.store().map(Arc::as_ref);
                AccessToken::from_request(&self.headers, &self.client_ip, store).await
            }
        };
        self.token.insert(token)
    }

    /// Grant the requester access to every resource in `access`
    ///
    /// With a store the grants are persisted under the requester's session.
    /// A requester without a session, or whose session is pinned to another
    /// address, gets a freshly minted one. The in-memory view is updated even
    /// if the store write fails, and the session id only changes once the
    /// store has accepted the write, so a failed write falls back to grant
    /// cookies.
    pub async fn add_access(&mut self, access: &AccessGrantMap) -> Result<()> {
        let store = self.context.store().cloned();
        let request_id = self.request_id.clone();
        let client_ip = self.client_ip.clone();
        let token = self.access_token().await;

        let Some(store) = store else {
            token.grants.merge(access);
            return Ok(());
        };

        let result = match token.session_id.as_deref() {
            Some(session_id) => {
                match store.add_session_access(session_id, &client_ip, access).await {
                    Err(Error::SessionMismatch { .. }) => {
                        warn!(
                            request_id = %request_id,
                            session_id = %session_id,
                            client_ip = %client_ip,
                            "session belongs to another address, starting a new one"
                        );
                        start_session(&store, &request_id, &client_ip, access).await
                    }
                    other => other,
                }
            }
            None => start_session(&store, &request_id, &client_ip, access).await,
        };

        match result {
            Ok(record) => {
                token.grants.merge(&record.access);
                token.session_id = Some(record.session_id);
                Ok(())
            }
            Err(e) => {
                token.grants.merge(access);
                Err(e)
            }
        }
    }

    /// Revoke the requester's access to every resource in `revoke`
    ///
    /// Without a session the grants are tombstoned, so the response
    /// overwrites the client's cookies with empty values.
    pub async fn revoke_access(&mut self, revoke: &AccessRevocationSet) -> Result<()> {
        let store = self.context.store().cloned();
        let client_ip = self.client_ip.clone();
        let token = self.access_token().await;

        match (store, token.session_id.clone()) {
            (Some(store), Some(session_id)) => {
                token.grants.revoke(revoke, RevokePolicy::Remove);
                store
                    .revoke_session_access(&session_id, &client_ip, revoke)
                    .await
            }
            _ => {
                token.grants.revoke(revoke, RevokePolicy::Tombstone);
                Ok(())
            }
        }
    }

    /// Live proof code for `(access_type, resource)`; tombstones read as absent
    pub async fn access_code(&mut self, access_type: &str, resource: &str) -> Option<AccessCode> {
        self.access_token()
            .await
            .grants
            .active_code(access_type, resource)
            .cloned()
    }

    /// Grant a single resource
    pub async fn grant(
        &mut self,
        access_type: impl Into<AccessType>,
        resource: impl Into<AccessResourceName>,
        code: impl Into<AccessCode>,
    ) -> Result<()> {
        let mut access = AccessGrantMap::new();
        access.add(access_type, resource, code);
        self.add_access(&access).await
    }

    /// Cookies carrying this request's access back to the client
    ///
    /// Empty if the access token was never built.
    pub fn response_cookies(&self) -> Vec<Cookie> {
        self.token
            .as_ref()
            .map(|token| token.response_cookies(self.context.cookie_expiration()))
            .unwrap_or_default()
    }

    /// Append the response cookies to `headers` as `Set-Cookie` headers
    ///
    /// Returns the number of headers added.
    pub fn apply_cookies(&self, headers: &mut HeaderMap) -> usize {
        let mut applied = 0;
        for cookie in self.response_cookies() {
            match HeaderValue::from_str(&cookie.to_header_value()) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                    applied += 1;
                }
                Err(e) => warn!(
                    request_id = %self.request_id,
                    cookie = %cookie.name,
                    error = %e,
                    "dropping cookie that is not a valid header value"
                ),
            }
        }
        applied
    }

    /// Whether the requester may make one more request of `service`
    pub async fn is_within_rate_limit(&self, service: &str) -> bool {
        self.context
            .is_within_rate_limit(service, &self.client_ip)
            .await
    }
}

/// Create a session under a new id derived from `request_id`
async fn start_session(
    store: &SessionStore,
    request_id: &str,
    client_ip: &str,
    access: &AccessGrantMap,
) -> Result<SessionRecord> {
    let session_id = new_session_id(request_id);
    store.create_session(&session_id, client_ip, access).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use warden_config::{AccessConfig, ServiceLimitConfig, SessionIpPolicy};
    use warden_store::{KeyValueBackend, MemoryBackend, WriteMode};

    /// Backend whose every call fails as if the store were unreachable
    struct DownBackend;

    #[async_trait]
    impl KeyValueBackend for DownBackend {
        fn endpoint(&self) -> &str {
            "down"
        }

        async fn ping(&self) -> Result<()> {
            Err(Error::network("down", "connection refused"))
        }

        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::network("down", "connection refused"))
        }

        async fn set(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Duration,
            _mode: WriteMode,
        ) -> Result<bool> {
            Err(Error::network("down", "connection refused"))
        }

        async fn delete(&self, _key: &str) -> Result<bool> {
            Err(Error::network("down", "connection refused"))
        }

        async fn increment(&self, _key: &str, _ttl: Duration) -> Result<i64> {
            Err(Error::network("down", "connection refused"))
        }
    }

    fn cookie_only_context() -> Arc<RequestContext> {
        let config = AccessConfig {
            limiters: vec![ServiceLimitConfig::new("auth", 60, 1)],
            ..Default::default()
        };
        Arc::new(RequestContext::builder(config).build().unwrap())
    }

    fn store_context() -> (Arc<SessionStore>, Arc<RequestContext>) {
        context_with(Arc::new(MemoryBackend::new()), AccessConfig::default())
    }

    fn context_with(
        backend: Arc<dyn KeyValueBackend>,
        config: AccessConfig,
    ) -> (Arc<SessionStore>, Arc<RequestContext>) {
        let store = Arc::new(SessionStore::with_backend(backend, &config));
        let context = RequestContext::builder(config)
            .store(store.clone())
            .build()
            .unwrap();
        (store, Arc::new(context))
    }

    fn page_request(context: Arc<RequestContext>, cookie: Option<&str>, ip: &str) -> PageRequest {
        let mut builder = Request::builder()
            .method(Method::GET)
            .uri("/files/photos/2024")
            .header("x-real-ip", ip)
            .header(USER_AGENT, "curl/8.5.0");
        if let Some(cookie) = cookie {
            builder = builder.header(http::header::COOKIE, cookie);
        }
        PageRequest::new(context, &builder.body(()).unwrap(), "/files/", None)
    }

    #[test]
    fn test_request_metadata() {
        let request = page_request(cookie_only_context(), None, "10.0.0.1");
        assert_eq!(request.rel_path(), "photos/2024");
        assert_eq!(request.client_ip(), "10.0.0.1");
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.request_id().split('-').count(), 3);
        request.log("listing folder");
        request.log("done");
    }

    #[tokio::test]
    async fn test_untouched_token_sets_no_cookies() {
        let request = page_request(cookie_only_context(), Some("view-docs=abc"), "10.0.0.1");
        assert!(request.response_cookies().is_empty());
    }

    #[tokio::test]
    async fn test_cookie_only_grant_and_revoke() {
        let mut request = page_request(cookie_only_context(), Some("view-docs=abc"), "10.0.0.1");
        request.grant("view", "photos", "def").await.unwrap();

        assert_eq!(
            request.access_code("view", "photos").await.map(AccessCode::into_string),
            Some("def".to_string())
        );

        request
            .revoke_access(&AccessRevocationSet::single("view", "docs"))
            .await
            .unwrap();
        assert!(request.access_code("view", "docs").await.is_none());

        let cookies = request.response_cookies();
        assert_eq!(cookies.len(), 2);
        let docs = cookies.iter().find(|c| c.name == "view-docs").unwrap();
        assert_eq!(docs.value, "");
        assert!(docs.expires.is_none());
        let photos = cookies.iter().find(|c| c.name == "view-photos").unwrap();
        assert_eq!(photos.value, "def");
        assert!(photos.expires.is_some());

        let mut headers = HeaderMap::new();
        assert_eq!(request.apply_cookies(&mut headers), 2);
        let values: Vec<_> = headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert!(values.contains(&"view-docs=; Path=/".to_string()));
    }

    #[tokio::test]
    async fn test_store_grant_creates_session() {
        let (store, context) = store_context();
        let mut request = page_request(context, None, "10.0.0.1");
        request.grant("view", "docs", "abc").await.unwrap();

        let session_id = request.access_token().await.session_id.clone().unwrap();
        assert_ne!(session_id, request.request_id());
        assert!(session_id.starts_with(request.request_id()));
        let record = store.get_access_token(&session_id, "10.0.0.1").await.unwrap();
        assert_eq!(record.access.get("view", "docs").map(|c| c.as_str()), Some("abc"));

        let cookies = request.response_cookies();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "session");
        assert_eq!(cookies[0].value, session_id);
    }

    #[tokio::test]
    async fn test_new_sessions_do_not_share_records() {
        let config = AccessConfig {
            session_ip_policy: SessionIpPolicy::Warn,
            ..Default::default()
        };
        let (_, context) = context_with(Arc::new(MemoryBackend::new()), config);

        let mut alice = page_request(context.clone(), None, "10.0.0.1");
        alice.grant("edit", "admin", "secret").await.unwrap();
        let mut bob = page_request(context, None, "10.9.9.9");
        bob.grant("view", "docs", "abc").await.unwrap();

        assert!(bob.access_code("edit", "admin").await.is_none());
        assert_ne!(
            alice.access_token().await.session_id,
            bob.access_token().await.session_id
        );
    }

    #[tokio::test]
    async fn test_failed_store_write_falls_back_to_grant_cookies() {
        let (_, context) = context_with(Arc::new(DownBackend), AccessConfig::default());
        let mut request = page_request(context, None, "10.0.0.1");

        let err = request.grant("view", "docs", "abc").await.unwrap_err();
        assert!(matches!(err, Error::Network { .. }));
        assert!(!request.access_token().await.has_session());

        let cookies = request.response_cookies();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "view-docs");
        assert_eq!(cookies[0].value, "abc");
    }

    #[tokio::test]
    async fn test_failed_store_write_keeps_presented_session() {
        let (_, context) = context_with(Arc::new(DownBackend), AccessConfig::default());
        let mut request = page_request(context, Some("session=s1"), "10.0.0.1");

        assert!(request.grant("view", "docs", "abc").await.is_err());
        assert_eq!(request.access_token().await.session_id.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn test_store_revoke() {
        let (store, context) = store_context();
        let grants: AccessGrantMap = [("view", "docs", "abc"), ("edit", "docs", "def")]
            .into_iter()
            .collect();
        store
            .add_session_access("s1", "10.0.0.1", &grants)
            .await
            .unwrap();

        let mut request = page_request(context, Some("session=s1"), "10.0.0.1");
        assert!(request.access_code("view", "docs").await.is_some());
        request
            .revoke_access(&AccessRevocationSet::single("view", "docs"))
            .await
            .unwrap();
        assert!(request.access_code("view", "docs").await.is_none());

        let record = store.get_access_token("s1", "10.0.0.1").await.unwrap();
        assert!(record.access.get("view", "docs").is_none());
        assert!(record.access.get("edit", "docs").is_some());
    }

    #[tokio::test]
    async fn test_foreign_session_is_replaced() {
        let (store, context) = store_context();
        let grants: AccessGrantMap = [("edit", "docs", "def")].into_iter().collect();
        store
            .add_session_access("s1", "10.0.0.1", &grants)
            .await
            .unwrap();

        let mut request = page_request(context, Some("session=s1"), "10.9.9.9");
        request.grant("view", "docs", "abc").await.unwrap();
        assert!(request.access_code("edit", "docs").await.is_none());

        let session_id = request.access_token().await.session_id.clone().unwrap();
        assert_ne!(session_id, "s1");
        assert!(session_id.starts_with(request.request_id()));
        assert!(store.get_access_token(&session_id, "10.9.9.9").await.is_ok());

        // The original session is untouched
        let original = store.get_access_token("s1", "10.0.0.1").await.unwrap();
        assert!(original.access.get("view", "docs").is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_by_client_ip() {
        let context = cookie_only_context();
        let first = page_request(context.clone(), None, "10.0.0.1");
        let second = page_request(context.clone(), None, "10.0.0.1");
        let other = page_request(context, None, "10.0.0.2");

        assert!(first.is_within_rate_limit("auth").await);
        assert!(!second.is_within_rate_limit("auth").await);
        assert!(other.is_within_rate_limit("auth").await);
        assert!(first.is_within_rate_limit("search").await);
    }
}
