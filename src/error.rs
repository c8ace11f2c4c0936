//! Error types for mcn-auth

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found. Run 'mcn-auth init' first.")]
    ConfigNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error ({medium}): {message}")]
    Storage { medium: String, message: String },

    #[error("Storage quota exceeded for {medium}: {needed} bytes needed, {limit} allowed")]
    StorageQuota {
        medium: String,
        needed: usize,
        limit: usize,
    },

    /// The login or refresh credential was refused by the auth server
    #[error("Credential rejected: {0}")]
    CredentialRejected(String),

    /// The server refused the bearer token on an authorized call
    #[error("Unauthorized: the server rejected the access token")]
    Unauthorized,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error means the server no longer accepts the session
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Error::Unauthorized | Error::CredentialRejected(_))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
