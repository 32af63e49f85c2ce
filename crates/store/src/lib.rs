//! Networked persistence for warden
//!
//! [`SessionStore`] keeps three kinds of data in a key-value service:
//!
//! - session records (`<prefix>-session:<id>`), the authoritative grant map
//!   of a principal pinned to the IP it was created from
//! - TTL-bounded JSON cache entries (`<prefix>-cache:<key>`)
//! - per-minute request counters (`<prefix>-rate:<type>:<client>`)
//!
//! The service itself sits behind [`KeyValueBackend`]; Redis is the
//! production backend and an in-memory map serves tests and local runs.

pub mod backend;
pub mod keys;
pub mod rate;
pub mod session;
pub mod store;

pub use backend::{KeyValueBackend, MemoryBackend, RedisBackend, WriteMode};
pub use keys::KeySpace;
pub use rate::StoreRateLimit;
pub use session::SessionRecord;
pub use store::SessionStore;
