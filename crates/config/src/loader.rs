//! Configuration loader for warden
//!
//! Assembles an [`AccessConfig`] at startup. Later sources override earlier
//! ones: defaults, then the JSON file (explicit path or `WARDEN_CONFIG`),
//! then individual `WARDEN_*` environment variables.

use crate::config::{AccessConfig, SessionIpPolicy, StoreConfig};
use std::path::{Path, PathBuf};
use warden_core::{
    Error, Result, WARDEN_CONFIG_VAR, WARDEN_COOKIE_EXPIRATION_VAR, WARDEN_IP_POLICY_VAR,
    WARDEN_KEY_PREFIX_VAR, WARDEN_STORE_URL_VAR,
};

/// Configuration loader that handles all startup configuration
pub struct ConfigLoader {
    /// Optional JSON file to load
    file: Option<PathBuf>,
    /// Whether `WARDEN_*` variables are applied
    read_environment: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            file: None,
            read_environment: true,
        }
    }

    /// Set the JSON file to load configuration from
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Set whether environment overrides are applied
    pub fn read_environment(mut self, read: bool) -> Self {
        self.read_environment = read;
        self
    }

    /// Load and validate the configuration
    pub fn load(self) -> Result<AccessConfig> {
        let file = self.file.clone().or_else(|| {
            self.read_environment
                .then(|| std::env::var_os(WARDEN_CONFIG_VAR).map(PathBuf::from))
                .flatten()
        });

        let mut config = match file {
            Some(path) => Self::read_file(&path)?,
            None => AccessConfig::default(),
        };

        if self.read_environment {
            Self::apply_environment(&mut config)?;
        }

        config.validate()?;
        tracing::debug!(
            key_prefix = %config.key_prefix,
            store = config.store.is_some(),
            limiters = config.limiters.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<AccessConfig> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::configuration(format!(
                "failed to parse config file '{}': {e}",
                path.display()
            ))
        })
    }

    fn apply_environment(config: &mut AccessConfig) -> Result<()> {
        if let Ok(url) = std::env::var(WARDEN_STORE_URL_VAR) {
            config.store.get_or_insert_with(StoreConfig::default).url = url;
        }
        if let Ok(prefix) = std::env::var(WARDEN_KEY_PREFIX_VAR) {
            config.key_prefix = prefix;
        }
        if let Ok(secs) = std::env::var(WARDEN_COOKIE_EXPIRATION_VAR) {
            config.cookie_expiration_secs = secs.trim().parse().map_err(|_| {
                Error::configuration(format!(
                    "{WARDEN_COOKIE_EXPIRATION_VAR} must be a number of seconds, got '{secs}'"
                ))
            })?;
        }
        if let Ok(policy) = std::env::var(WARDEN_IP_POLICY_VAR) {
            config.session_ip_policy = policy.parse::<SessionIpPolicy>()?;
        }
        Ok(())
    }
}
