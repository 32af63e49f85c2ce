//! Common interface of the rate-limit strategies

use async_trait::async_trait;
use warden_core::Result;

/// Decides whether one more request of `service` from `client` may proceed
///
/// Exceeding the limit is `Ok(false)`, not an error; `Err` means the
/// strategy itself could not answer (e.g. the store was unreachable).
#[async_trait]
pub trait RateLimit: Send + Sync {
    async fn check(&self, service: &str, client: &str) -> Result<bool>;
}
