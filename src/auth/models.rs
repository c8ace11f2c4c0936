//! Session models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which dashboard a user signs in to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginType {
    /// Brand / advertiser
    Brand,
    /// MCN agency
    Mcn,
    /// Talent / creator
    Talent,
}

impl fmt::Display for LoginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginType::Brand => write!(f, "brand"),
            LoginType::Mcn => write!(f, "mcn"),
            LoginType::Talent => write!(f, "talent"),
        }
    }
}

impl FromStr for LoginType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "brand" => Ok(LoginType::Brand),
            "mcn" | "agency" => Ok(LoginType::Mcn),
            "talent" | "creator" => Ok(LoginType::Talent),
            other => Err(format!("unknown login type '{}'", other)),
        }
    }
}

/// Storage medium holding the live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoragePreference {
    /// Survives restarts ("remember me")
    Local,
    /// Gone when the process ends
    #[default]
    Session,
}

impl StoragePreference {
    pub fn from_remember_me(remember_me: bool) -> Self {
        if remember_me {
            StoragePreference::Local
        } else {
            StoragePreference::Session
        }
    }
}

impl fmt::Display for StoragePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoragePreference::Local => write!(f, "local"),
            StoragePreference::Session => write!(f, "session"),
        }
    }
}

/// Token record as persisted in a storage medium
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Epoch milliseconds
    pub expires_at: i64,
}

/// Tokens to persist, as handed out by the auth server
#[derive(Debug, Clone)]
pub struct NewTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime in seconds from now
    pub expires_in: i64,
    pub preference: StoragePreference,
}

/// A role and the modules it grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub role_id: String,
    pub name: String,
    #[serde(default)]
    pub modules: Vec<String>,
}

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Flattened accessible module identifiers
    #[serde(default)]
    pub modules: Vec<String>,
}

impl SessionUser {
    /// Check whether the user may open a module
    pub fn has_module(&self, module: &str) -> bool {
        self.modules.iter().any(|m| m == module)
            || self
                .roles
                .iter()
                .any(|role| role.modules.iter().any(|m| m == module))
    }

    pub fn role_names(&self) -> Vec<&str> {
        self.roles.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Credentials for an SMS-code login
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub phone: String,
    pub sms_code: String,
    pub login_type: LoginType,
    pub remember_me: bool,
}

/// Coarse lifecycle phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Loading,
    Authenticated,
    Anonymous,
}

/// Reactive session state observed by the rest of the application
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub user: Option<SessionUser>,
    pub loading: bool,
    pub preferred_login_type: Option<LoginType>,
    /// Set once startup rehydration has begun
    pub initialized: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
            preferred_login_type: None,
            initialized: false,
        }
    }
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        if !self.initialized {
            SessionPhase::Uninitialized
        } else if self.user.is_some() {
            SessionPhase::Authenticated
        } else if self.loading {
            SessionPhase::Loading
        } else {
            SessionPhase::Anonymous
        }
    }
}
