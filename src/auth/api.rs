//! The auth server contract the session depends on

use crate::auth::models::{LoginRequest, SessionUser};
use crate::error::Result;
use async_trait::async_trait;

/// Successful SMS-code login
#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: SessionUser,
}

/// Current permissions of the signed-in user
#[derive(Debug, Clone)]
pub struct PermissionsResponse {
    pub user_id: String,
    pub name: String,
    pub phone: String,
    pub available_modules: Vec<String>,
}

/// A freshly minted access token
#[derive(Debug, Clone)]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
    /// Present when the server rotates refresh tokens
    pub refresh_token: Option<String>,
}

/// Calls the session makes against the auth server.
///
/// Authorized calls (`logout`, `verify_token`, `fetch_permissions`) carry the
/// current access token. `login_with_captcha` and `refresh_token` are
/// anonymous and report a refused credential as
/// [`Error::CredentialRejected`](crate::Error::CredentialRejected).
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login_with_captcha(&self, request: &LoginRequest) -> Result<LoginResponse>;

    async fn logout(&self) -> Result<()>;

    async fn verify_token(&self) -> Result<()>;

    async fn fetch_permissions(&self) -> Result<PermissionsResponse>;

    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshResponse>;
}
