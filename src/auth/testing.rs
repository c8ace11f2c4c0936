//! Scriptable in-process auth server for unit tests

use crate::auth::api::{AuthApi, LoginResponse, PermissionsResponse, RefreshResponse};
use crate::auth::models::{LoginRequest, SessionUser};
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type RefreshCallback = Arc<dyn Fn() + Send + Sync>;

/// Answers from queued/scripted values; anything unscripted fails.
#[derive(Default)]
pub(crate) struct StubAuthApi {
    login: Mutex<Option<LoginResponse>>,
    permissions: Mutex<Option<PermissionsResponse>>,
    refreshes: Mutex<VecDeque<RefreshResponse>>,
    refresh_tokens_seen: Mutex<Vec<String>>,
    on_refresh: Mutex<Option<RefreshCallback>>,
    verify_ok: AtomicBool,
    verify_delay: Mutex<Option<Duration>>,
    logout_ok: AtomicBool,
    login_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    permissions_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
}

impl StubAuthApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept_login(&self, response: LoginResponse) {
        *self.login.lock() = Some(response);
    }

    pub fn set_permissions(&self, response: PermissionsResponse) {
        *self.permissions.lock() = Some(response);
    }

    pub fn push_refresh(&self, response: RefreshResponse) {
        self.refreshes.lock().push_back(response);
    }

    /// Run `callback` inside the refresh call, before it answers
    pub fn on_refresh(&self, callback: RefreshCallback) {
        *self.on_refresh.lock() = Some(callback);
    }

    pub fn set_verify_ok(&self, ok: bool) {
        self.verify_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_verify_delay(&self, delay: Duration) {
        *self.verify_delay.lock() = Some(delay);
    }

    pub fn set_logout_ok(&self, ok: bool) {
        self.logout_ok.store(ok, Ordering::SeqCst);
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn permissions_calls(&self) -> usize {
        self.permissions_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        self.refresh_tokens_seen.lock().clone()
    }
}

#[async_trait]
impl AuthApi for StubAuthApi {
    async fn login_with_captcha(&self, _request: &LoginRequest) -> Result<LoginResponse> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.login
            .lock()
            .clone()
            .ok_or_else(|| Error::CredentialRejected("invalid verification code".to_string()))
    }

    async fn logout(&self) -> Result<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.logout_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Api {
                status: 503,
                message: "service unavailable".to_string(),
            })
        }
    }

    async fn verify_token(&self) -> Result<()> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.verify_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.verify_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }

    async fn fetch_permissions(&self) -> Result<PermissionsResponse> {
        self.permissions_calls.fetch_add(1, Ordering::SeqCst);
        self.permissions.lock().clone().ok_or(Error::Api {
            status: 500,
            message: "permissions unavailable".to_string(),
        })
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshResponse> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_tokens_seen.lock().push(refresh_token.to_string());
        let callback = self.on_refresh.lock().clone();
        if let Some(callback) = callback {
            callback();
        }
        self.refreshes
            .lock()
            .pop_front()
            .ok_or_else(|| Error::CredentialRejected("refresh token expired".to_string()))
    }
}

pub(crate) fn alice() -> SessionUser {
    SessionUser {
        id: "u1".to_string(),
        name: "Alice".to_string(),
        phone: "1380000000".to_string(),
        roles: vec![],
        modules: vec!["dashboard".to_string()],
    }
}

pub(crate) fn alice_login() -> LoginResponse {
    LoginResponse {
        access_token: "acc1".to_string(),
        refresh_token: "ref1".to_string(),
        expires_in: 3600,
        user: alice(),
    }
}
