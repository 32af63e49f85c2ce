//! Rate limiting for warden
//!
//! Two interchangeable strategies sit behind the [`RateLimit`] trait:
//!
//! - [`RateLimiters`]: in-process token buckets, one registry per named
//!   service, one bucket per client, idle buckets evicted periodically.
//! - a store-backed per-minute counter, implemented in `warden-store`.

pub mod bucket;
pub mod registry;
pub mod service;
pub mod strategy;

pub use bucket::TokenBucket;
pub use registry::ClientLimiters;
pub use service::RateLimiters;
pub use strategy::RateLimit;
