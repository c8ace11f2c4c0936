//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub devserver: DevServerConfig,
}

/// Auth API the client talks to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub endpoints: EndpointConfig,
}

fn default_base_url() -> String {
    "http://127.0.0.1:3457".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            endpoints: EndpointConfig::default(),
        }
    }
}

/// Paths of the auth endpoints, relative to `base_url`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_login_path")]
    pub login: String,

    #[serde(default = "default_logout_path")]
    pub logout: String,

    #[serde(default = "default_verify_path")]
    pub verify: String,

    #[serde(default = "default_permissions_path")]
    pub permissions: String,

    #[serde(default = "default_refresh_path")]
    pub refresh: String,
}

fn default_login_path() -> String {
    "/api/auth/login".to_string()
}

fn default_logout_path() -> String {
    "/api/auth/logout".to_string()
}

fn default_verify_path() -> String {
    "/api/auth/verify".to_string()
}

fn default_permissions_path() -> String {
    "/api/auth/permissions".to_string()
}

fn default_refresh_path() -> String {
    "/api/auth/refresh".to_string()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            login: default_login_path(),
            logout: default_logout_path(),
            verify: default_verify_path(),
            permissions: default_permissions_path(),
            refresh: default_refresh_path(),
        }
    }
}

/// Session lifecycle timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Tokens expiring within this many seconds are treated as expired
    #[serde(default = "default_expiry_buffer_secs")]
    pub expiry_buffer_secs: i64,

    /// How long before expiry the silent refresh fires
    #[serde(default = "default_refresh_lead_secs")]
    pub refresh_lead_secs: u64,

    /// Lower bound on the refresh timer delay
    #[serde(default = "default_min_refresh_delay_secs")]
    pub min_refresh_delay_secs: u64,
}

fn default_expiry_buffer_secs() -> i64 {
    30
}

fn default_refresh_lead_secs() -> u64 {
    300
}

fn default_min_refresh_delay_secs() -> u64 {
    10
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry_buffer_secs: default_expiry_buffer_secs(),
            refresh_lead_secs: default_refresh_lead_secs(),
            min_refresh_delay_secs: default_min_refresh_delay_secs(),
        }
    }
}

/// Where "remember me" sessions are kept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_local_path")]
    pub local_path: PathBuf,
}

fn default_local_path() -> PathBuf {
    PathBuf::from("./.mcn-auth/local-storage.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_path: default_local_path(),
        }
    }
}

/// Development auth server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevServerConfig {
    #[serde(default = "default_dev_host")]
    pub host: String,

    #[serde(default = "default_dev_port")]
    pub port: u16,

    /// One-time code accepted for every phone number
    #[serde(default = "default_sms_code")]
    pub sms_code: String,

    /// Access token lifetime in seconds
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,

    /// Refresh token lifetime in seconds
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: i64,

    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Known users keyed by phone number
    #[serde(default)]
    pub users: HashMap<String, DevUserConfig>,
}

fn default_dev_host() -> String {
    "127.0.0.1".to_string()
}

fn default_dev_port() -> u16 {
    3457
}

fn default_sms_code() -> String {
    "123456".to_string()
}

fn default_token_ttl_secs() -> i64 {
    3600
}

fn default_refresh_ttl_secs() -> i64 {
    7 * 24 * 60 * 60
}

fn default_jwt_secret() -> String {
    "mcn-auth-dev-secret-change-me".to_string()
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            host: default_dev_host(),
            port: default_dev_port(),
            sms_code: default_sms_code(),
            token_ttl_secs: default_token_ttl_secs(),
            refresh_ttl_secs: default_refresh_ttl_secs(),
            jwt_secret: default_jwt_secret(),
            users: HashMap::new(),
        }
    }
}

/// A preconfigured development user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevUserConfig {
    pub id: String,
    pub name: String,

    /// Extra modules granted on top of the login type's defaults
    #[serde(default)]
    pub modules: Vec<String>,
}
