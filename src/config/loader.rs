//! Configuration loading and environment variable interpolation

use crate::error::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::Path;

use super::Config;

pub const CONFIG_FILENAME: &str = "mcn-auth.toml";

/// Load configuration from mcn-auth.toml
pub fn load_config() -> Result<Config> {
    let config_path = find_config_file()?;
    load_config_from_path(&config_path)
}

/// Load configuration, falling back to defaults when no file exists
pub fn load_config_or_default() -> Result<Config> {
    match load_config() {
        Err(Error::ConfigNotFound) => {
            tracing::debug!("No {} found, using defaults", CONFIG_FILENAME);
            Ok(Config::default())
        }
        other => other,
    }
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|_| Error::ConfigNotFound)?;
    parse_config(&content)
}

/// Parse configuration text after interpolating environment variables
pub fn parse_config(content: &str) -> Result<Config> {
    let content = interpolate_env_vars(content);
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Largest accepted `session.expiry_buffer_secs` (one day)
const MAX_EXPIRY_BUFFER_SECS: i64 = 24 * 60 * 60;

fn validate(config: &Config) -> Result<()> {
    if config.session.expiry_buffer_secs < 0 {
        return Err(Error::Config(
            "session.expiry_buffer_secs must not be negative".to_string(),
        ));
    }
    if config.session.expiry_buffer_secs > MAX_EXPIRY_BUFFER_SECS {
        return Err(Error::Config(format!(
            "session.expiry_buffer_secs must be at most {}, got {}",
            MAX_EXPIRY_BUFFER_SECS, config.session.expiry_buffer_secs
        )));
    }
    if !config.api.base_url.starts_with("http://") && !config.api.base_url.starts_with("https://")
    {
        return Err(Error::Config(format!(
            "api.base_url must be an http(s) URL, got '{}'",
            config.api.base_url
        )));
    }
    Ok(())
}

/// Find the configuration file, searching upward from current directory
fn find_config_file() -> Result<std::path::PathBuf> {
    let mut current = env::current_dir().map_err(|e| Error::Config(e.to_string()))?;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(Error::ConfigNotFound);
        }
    }
}

/// Interpolate environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn interpolate_env_vars(content: &str) -> String {
    // This regex is a compile-time constant, panicking is acceptable here
    // as it indicates a programming error in the codebase, not a runtime issue
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("Invalid regex pattern - this is a bug in the codebase");

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

/// Generate a default configuration file content
pub fn default_config_content() -> &'static str {
    r#"# mcn-auth configuration

[api]
base_url = "${MCN_AUTH_API_URL:-http://127.0.0.1:3457}"
timeout_secs = 15

# Override individual endpoint paths if the backend differs
# [api.endpoints]
# login = "/api/auth/login"
# logout = "/api/auth/logout"
# verify = "/api/auth/verify"
# permissions = "/api/auth/permissions"
# refresh = "/api/auth/refresh"

[session]
expiry_buffer_secs = 30
refresh_lead_secs = 300
min_refresh_delay_secs = 10

[storage]
# "Remember me" sessions are written here; other sessions live in memory
local_path = "./.mcn-auth/local-storage.json"

# Development auth server (mcn-auth serve)
[devserver]
host = "127.0.0.1"
port = 3457
sms_code = "123456"
token_ttl_secs = 3600
refresh_ttl_secs = 604800
jwt_secret = "${MCN_AUTH_JWT_SECRET:-mcn-auth-dev-secret-change-me}"

# [devserver.users.13800000000]
# id = "u1"
# name = "Alice"
# modules = ["finance"]
"#
}
