//! Configuration management for warden
//!
//! This crate defines the immutable [`AccessConfig`] shared by every request
//! and the [`ConfigLoader`] that assembles it at startup from defaults, an
//! optional JSON file and `WARDEN_*` environment overrides.

pub mod config;
pub mod loader;

#[cfg(test)]
mod config_tests;

pub use config::*;
pub use loader::ConfigLoader;
