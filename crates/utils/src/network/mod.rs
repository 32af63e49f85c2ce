//! Network-related utilities.
//!
//! ## Key Components
//!
//! - **`client_ip`**: resolves the originating client address of a request,
//!   taking reverse-proxy headers into account.

pub mod client_ip;

pub use client_ip::{ClientIpResolver, HeaderClientIpResolver};
