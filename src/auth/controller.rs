//! Session controller
//!
//! Single owner of the reactive [`SessionState`]. It drives login, logout and
//! startup rehydration, and tears the session down when the transport reports
//! that the server rejected our credential.

use crate::auth::api::AuthApi;
use crate::auth::guard::{RefreshTiming, TransportGuard, UnauthorizedHook};
use crate::auth::http::HttpAuthApi;
use crate::auth::models::{
    LoginRequest, LoginType, NewTokens, SessionState, SessionUser, StoragePreference,
};
use crate::auth::token_store::TokenStore;
use crate::auth::transport::Transport;
use crate::auth::user_cache::UserCache;
use crate::config::Config;
use crate::error::Result;
use crate::storage::{FileStorage, MemoryStorage, StorageMedia};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Cloneable handle to one session; clones share state
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn AuthApi>,
    store: TokenStore,
    users: UserCache,
    guard: TransportGuard,
    transport: Option<Transport>,
    state: watch::Sender<SessionState>,
    expiry_buffer_secs: i64,
}

impl SessionController {
    pub fn new(
        api: Arc<dyn AuthApi>,
        store: TokenStore,
        users: UserCache,
        guard: TransportGuard,
        expiry_buffer_secs: i64,
    ) -> Self {
        Self::assemble(api, store, users, guard, None, expiry_buffer_secs)
    }

    /// HTTP-backed session with "remember me" data in the configured file
    pub fn from_config(config: &Config) -> Result<Self> {
        let media = StorageMedia::new(
            Arc::new(FileStorage::new(&config.storage.local_path)),
            Arc::new(MemoryStorage::named("session")),
        );
        Self::from_config_with_media(config, media)
    }

    pub fn from_config_with_media(config: &Config, media: StorageMedia) -> Result<Self> {
        let store = TokenStore::new(media.clone());
        let hook = UnauthorizedHook::new();
        let transport = Transport::new(
            &config.api.base_url,
            Duration::from_secs(config.api.timeout_secs),
            store.clone(),
            hook.clone(),
        )?;
        let api: Arc<dyn AuthApi> = Arc::new(HttpAuthApi::new(
            transport.clone(),
            config.api.endpoints.clone(),
        ));
        let guard = TransportGuard::new(
            api.clone(),
            store.clone(),
            hook,
            RefreshTiming::from(&config.session),
        );

        Ok(Self::assemble(
            api,
            store,
            UserCache::new(media),
            guard,
            Some(transport),
            config.session.expiry_buffer_secs,
        ))
    }

    fn assemble(
        api: Arc<dyn AuthApi>,
        store: TokenStore,
        users: UserCache,
        guard: TransportGuard,
        transport: Option<Transport>,
        expiry_buffer_secs: i64,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(Inner {
                api,
                store,
                users,
                guard,
                transport,
                state,
                expiry_buffer_secs,
            }),
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.inner.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.store.get_access_token()
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.inner.store
    }

    pub fn guard(&self) -> &TransportGuard {
        &self.inner.guard
    }

    /// Authorized HTTP transport, when built from config
    pub fn transport(&self) -> Option<&Transport> {
        self.inner.transport.as_ref()
    }

    /// Restore the session persisted by a previous run.
    ///
    /// A valid stored token plus a cached user restores the session at once;
    /// the token is then verified in the background and the session is torn
    /// down if the server rejects it. Must be called within a tokio runtime.
    pub fn rehydrate(&self) -> Rehydration {
        self.inner.state.send_modify(|s| {
            s.initialized = true;
            s.loading = true;
        });

        let cancelled = Arc::new(AtomicBool::new(false));
        let cached = if self.inner.store.is_token_expired(self.inner.expiry_buffer_secs) {
            None
        } else {
            self.inner.users.load_user()
        };

        let Some(user) = cached else {
            tracing::debug!("No valid stored session to restore");
            self.force_logout();
            return Rehydration {
                cancelled,
                verification: None,
            };
        };

        tracing::info!("Restoring session for user {}", user.id);
        self.inner.state.send_modify(|s| {
            s.user = Some(user);
            s.loading = false;
        });
        self.arm_unauthorized_handler();

        if let Some(remaining) = self.inner.store.seconds_until_expiry().filter(|s| *s > 0) {
            self.inner.guard.start_token_auto_refresh(remaining);
        }

        let controller = self.clone();
        let flag = cancelled.clone();
        let verification = tokio::spawn(async move {
            let result = controller.inner.api.verify_token().await;
            if flag.load(Ordering::SeqCst) {
                tracing::debug!("Rehydration cancelled, ignoring verification result");
                return;
            }
            match result {
                Ok(()) => tracing::debug!("Stored session verified"),
                Err(e) => {
                    tracing::warn!("Stored session rejected: {}", e);
                    // Never confirmed valid, so no server-side logout
                    controller.force_logout();
                }
            }
        });

        Rehydration {
            cancelled,
            verification: Some(verification),
        }
    }

    /// Sign in with a phone number and one-time code.
    ///
    /// On failure the error from the auth server is returned unchanged.
    pub async fn login(&self, request: &LoginRequest) -> Result<SessionUser> {
        self.inner.state.send_modify(|s| {
            s.initialized = true;
            s.loading = true;
        });

        let response = match self.inner.api.login_with_captcha(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::info!("Login failed for {}: {}", request.phone, e);
                self.inner.state.send_modify(|s| s.loading = false);
                return Err(e);
            }
        };

        let preference = StoragePreference::from_remember_me(request.remember_me);
        self.inner.store.save_tokens(NewTokens {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in,
            preference,
        });
        self.inner.users.save_user(&response.user, preference);
        self.arm_unauthorized_handler();
        self.inner
            .guard
            .start_token_auto_refresh(response.expires_in);

        let user = response.user;
        tracing::info!(
            "User {} signed in as {} ({} storage)",
            user.id,
            request.login_type,
            preference
        );
        self.inner.state.send_modify(|s| {
            s.user = Some(user.clone());
            s.loading = false;
        });
        Ok(user)
    }

    /// Sign out on the server (best effort) and clear the local session
    pub async fn logout(&self) {
        if let Err(e) = self.inner.api.logout().await {
            tracing::warn!("Server logout failed, clearing local session anyway: {}", e);
        }
        self.force_logout();
    }

    /// Tear down the local session without contacting the server.
    ///
    /// Safe to call any number of times.
    pub fn force_logout(&self) {
        self.inner.guard.set_unauthorized_handler(None);
        self.inner.guard.stop_token_auto_refresh();
        self.inner.store.clear_tokens();
        self.inner.users.clear_user();

        let was_authenticated = self.inner.state.borrow().is_authenticated();
        self.inner.state.send_modify(|s| {
            s.user = None;
            s.loading = false;
            s.initialized = true;
        });
        if was_authenticated {
            tracing::info!("Session ended");
        }
    }

    /// Reload the user's module list from the server.
    ///
    /// Failures are logged and leave the session untouched, except a 401,
    /// which the transport reports to the unauthorized handler first.
    pub async fn refresh_user_profile(&self) -> Option<SessionUser> {
        let permissions = match self.inner.api.fetch_permissions().await {
            Ok(permissions) => permissions,
            Err(e) => {
                tracing::warn!("Failed to refresh permissions: {}", e);
                return None;
            }
        };

        let mut updated = None;
        self.inner.state.send_if_modified(|s| match s.user.as_mut() {
            Some(user) if user.id == permissions.user_id => {
                user.modules = permissions.available_modules.clone();
                updated = Some(user.clone());
                true
            }
            Some(user) => {
                tracing::warn!(
                    "Ignoring permissions for user {} while {} is signed in",
                    permissions.user_id,
                    user.id
                );
                false
            }
            None => false,
        });

        let user = updated?;
        self.inner
            .users
            .save_user(&user, self.inner.store.get_storage_preference());
        tracing::debug!("Permissions refreshed: {} modules", user.modules.len());
        Some(user)
    }

    pub fn set_preferred_login_type(&self, login_type: Option<LoginType>) {
        self.inner
            .state
            .send_modify(|s| s.preferred_login_type = login_type);
    }

    fn arm_unauthorized_handler(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner
            .guard
            .set_unauthorized_handler(Some(Arc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    tracing::warn!("Credential rejected by server, signing out");
                    SessionController { inner }.force_logout();
                }
            })));
    }
}

/// Background verification started by [`SessionController::rehydrate`]
pub struct Rehydration {
    cancelled: Arc<AtomicBool>,
    verification: Option<JoinHandle<()>>,
}

impl Rehydration {
    /// Stop a pending verification from changing the session
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether a stored session was restored and is being verified
    pub fn is_verifying(&self) -> bool {
        self.verification
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// Wait for the background verification to settle
    pub async fn finished(self) {
        if let Some(task) = self.verification {
            if let Err(e) = task.await {
                tracing::debug!("Verification task ended abnormally: {}", e);
            }
        }
    }
}
