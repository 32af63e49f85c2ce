//! Request-scoped access control for warden
//!
//! [`RequestContext`] is built once at startup and shared by every request
//! task. Each request gets a [`PageRequest`], which lazily reconciles the
//! client's cookies with its server-side session into an [`AccessToken`]
//! and writes the resulting cookies back before the response is sent.

pub mod context;
pub mod request;
pub mod token;

pub use context::{RequestContext, RequestContextBuilder};
pub use request::PageRequest;
pub use token::AccessToken;
