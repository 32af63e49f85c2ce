//! Core error type and constants for the `warden` access-control workspace.
//!
//! Every other crate in the workspace reports failures through the single
//! [`Error`] enum defined here, so callers can classify a failure (transient
//! store problem, validation problem, startup configuration problem) without
//! knowing which crate produced it.
//!
//! ## Key Components
//!
//! - **`errors`**: the `Error` enum and the `Result` alias.
//! - **`constants`**: cookie names, store key namespaces and environment
//!   variable names shared between crates.

pub mod constants;
pub mod errors;

pub use self::{
    constants::*,
    errors::{Error, Result},
};
