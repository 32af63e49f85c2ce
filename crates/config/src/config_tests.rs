//! Unit tests for configuration loading

#[cfg(test)]
mod tests {
    use crate::{
        AccessConfig, ConfigLoader, RateLimitStrategy, ServiceLimitConfig, SessionIpPolicy,
        StoreConfig, MAX_TTL_SECS,
    };
    use serial_test::serial;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use warden_core::{
        WARDEN_CONFIG_VAR, WARDEN_COOKIE_EXPIRATION_VAR, WARDEN_IP_POLICY_VAR,
        WARDEN_KEY_PREFIX_VAR, WARDEN_STORE_URL_VAR,
    };

    fn clear_env() {
        for var in [
            WARDEN_CONFIG_VAR,
            WARDEN_STORE_URL_VAR,
            WARDEN_KEY_PREFIX_VAR,
            WARDEN_COOKIE_EXPIRATION_VAR,
            WARDEN_IP_POLICY_VAR,
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AccessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.key_prefix, "warden");
        assert_eq!(config.session_ip_policy, SessionIpPolicy::Enforce);
        assert_eq!(config.cookie_expiration(), Duration::from_secs(604_800));
        assert_eq!(config.session_ttl(), config.cookie_expiration());
    }

    #[test]
    fn test_store_strategy_requires_store() {
        let config = AccessConfig {
            rate_limit_strategy: RateLimitStrategy::Store,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AccessConfig {
            rate_limit_strategy: RateLimitStrategy::Store,
            store: Some(StoreConfig::default()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_limiter_rejected() {
        let config = AccessConfig {
            limiters: vec![
                ServiceLimitConfig::new("auth", 10, 2),
                ServiceLimitConfig::new("auth", 20, 2),
            ],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("configured twice"));
    }

    #[test]
    fn test_lifetimes_are_bounded() {
        let config = AccessConfig {
            cookie_expiration_secs: MAX_TTL_SECS,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = AccessConfig {
            cookie_expiration_secs: u64::MAX,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cookie_expiration_secs"));

        for store in [
            StoreConfig {
                cache_ttl_secs: MAX_TTL_SECS + 1,
                ..Default::default()
            },
            StoreConfig {
                session_ttl_secs: Some(u64::MAX),
                ..Default::default()
            },
            StoreConfig {
                rate_window_secs: u64::MAX,
                ..Default::default()
            },
        ] {
            let config = AccessConfig {
                store: Some(store),
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(warden_core::Error::Configuration { .. })
            ));
        }
    }

    #[test]
    #[serial]
    fn test_oversized_environment_lifetime_rejected() {
        clear_env();
        std::env::set_var(WARDEN_COOKIE_EXPIRATION_VAR, u64::MAX.to_string());
        let result = ConfigLoader::new().load();
        clear_env();
        assert!(result.is_err());
    }

    #[test]
    fn test_refill_rate() {
        let limiter = ServiceLimitConfig::new("auth", 120, 5);
        assert!((limiter.refill_rate() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        clear_env();
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "key_prefix": "files",
                "session_ip_policy": "warn",
                "store": {{ "url": "redis://cache:6379/2", "op_timeout_ms": 250 }},
                "limiters": [{{ "service": "auth", "limit_per_minute": 30 }}]
            }}"#
        )
        .unwrap();

        let config = ConfigLoader::new().file(file.path()).load().unwrap();
        assert_eq!(config.key_prefix, "files");
        assert_eq!(config.session_ip_policy, SessionIpPolicy::Warn);
        let store = config.store.unwrap();
        assert_eq!(store.url, "redis://cache:6379/2");
        assert_eq!(store.op_timeout(), Duration::from_millis(250));
        assert_eq!(store.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.limiters[0].burst, 1);
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear_env();
        std::env::set_var(WARDEN_STORE_URL_VAR, "redis://override:6379");
        std::env::set_var(WARDEN_COOKIE_EXPIRATION_VAR, "120");
        std::env::set_var(WARDEN_IP_POLICY_VAR, "Ignore");

        let config = ConfigLoader::new().load().unwrap();
        clear_env();

        assert_eq!(config.store.as_ref().unwrap().url, "redis://override:6379");
        assert_eq!(config.cookie_expiration(), Duration::from_secs(120));
        assert_eq!(config.session_ip_policy, SessionIpPolicy::Ignore);
    }

    #[test]
    #[serial]
    fn test_invalid_environment_value() {
        clear_env();
        std::env::set_var(WARDEN_IP_POLICY_VAR, "sometimes");
        let result = ConfigLoader::new().load();
        clear_env();
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_missing_file_is_configuration_error() {
        clear_env();
        let result = ConfigLoader::new()
            .file("/nonexistent/warden.json")
            .read_environment(false)
            .load();
        assert!(matches!(
            result,
            Err(warden_core::Error::Configuration { .. })
        ));
    }
}
