/// Constants used throughout the warden workspace
// Cookie wire contract
pub const SESSION_COOKIE: &str = "session";
pub const COOKIE_PATH: &str = "/";
pub const GRANT_COOKIE_SEPARATOR: char = '-';

// Store key namespaces, prefixed with the configured key prefix
pub const DEFAULT_KEY_PREFIX: &str = "warden";
pub const CACHE_NAMESPACE: &str = "cache";
pub const RATE_NAMESPACE: &str = "rate";
pub const SESSION_NAMESPACE: &str = "session";

// Environment variable names
pub const WARDEN_CONFIG_VAR: &str = "WARDEN_CONFIG";
pub const WARDEN_STORE_URL_VAR: &str = "WARDEN_STORE_URL";
pub const WARDEN_KEY_PREFIX_VAR: &str = "WARDEN_KEY_PREFIX";
pub const WARDEN_COOKIE_EXPIRATION_VAR: &str = "WARDEN_COOKIE_EXPIRATION_SECS";
pub const WARDEN_IP_POLICY_VAR: &str = "WARDEN_SESSION_IP_POLICY";
pub const WARDEN_LOG_VAR: &str = "WARDEN_LOG";
