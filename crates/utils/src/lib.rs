//! Shared utilities for warden
//!
//! This crate provides the small collaborators the access-control core
//! depends on but does not own: log initialisation, client IP resolution
//! from proxy headers, and request identifier generation.

pub mod network;
pub mod request_id;
pub mod tracing;

pub use network::*;
pub use request_id::*;
pub use self::tracing::*;
