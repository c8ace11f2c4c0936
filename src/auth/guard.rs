//! Unauthorized-response hook and the proactive token refresh timer

use crate::auth::api::AuthApi;
use crate::auth::models::NewTokens;
use crate::auth::token_store::TokenStore;
use crate::config::SessionConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub type UnauthorizedHandler = Arc<dyn Fn() + Send + Sync>;

/// Single-slot observer for "the server rejected our credential".
///
/// Clones share the slot, so the transport and the guard always see the same
/// handler. Setting a new handler replaces the old one.
#[derive(Clone, Default)]
pub struct UnauthorizedHook {
    slot: Arc<Mutex<Option<UnauthorizedHandler>>>,
}

impl UnauthorizedHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, handler: Option<UnauthorizedHandler>) {
        *self.slot.lock() = handler;
    }

    pub fn is_set(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Invoke the handler, if any. Returns whether one ran.
    pub fn notify(&self) -> bool {
        // Release the slot before calling out: the handler may clear it
        let handler = self.slot.lock().clone();
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => {
                tracing::debug!("Unauthorized response with no handler registered");
                false
            }
        }
    }
}

/// When the silent refresh fires relative to expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTiming {
    pub lead: Duration,
    pub min_delay: Duration,
}

impl RefreshTiming {
    /// `max(expires_in - lead, min_delay)`
    pub fn delay_for(&self, expires_in_secs: i64) -> Duration {
        let expires_in = Duration::from_secs(expires_in_secs.max(0) as u64);
        expires_in.saturating_sub(self.lead).max(self.min_delay)
    }
}

impl Default for RefreshTiming {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for RefreshTiming {
    fn from(config: &SessionConfig) -> Self {
        Self {
            lead: Duration::from_secs(config.refresh_lead_secs),
            min_delay: Duration::from_secs(config.min_refresh_delay_secs),
        }
    }
}

/// Owns the refresh timer and the unauthorized handler slot
#[derive(Clone)]
pub struct TransportGuard {
    inner: Arc<GuardInner>,
}

struct GuardInner {
    api: Arc<dyn AuthApi>,
    store: TokenStore,
    hook: UnauthorizedHook,
    timing: RefreshTiming,
    timer: Mutex<Option<JoinHandle<()>>>,
    /// Bumped whenever the timer is re-armed or stopped; a refresh result
    /// from an older epoch is discarded
    epoch: Arc<Mutex<u64>>,
}

impl TransportGuard {
    pub fn new(
        api: Arc<dyn AuthApi>,
        store: TokenStore,
        hook: UnauthorizedHook,
        timing: RefreshTiming,
    ) -> Self {
        Self {
            inner: Arc::new(GuardInner {
                api,
                store,
                hook,
                timing,
                timer: Mutex::new(None),
                epoch: Arc::new(Mutex::new(0)),
            }),
        }
    }

    pub fn hook(&self) -> &UnauthorizedHook {
        &self.inner.hook
    }

    /// Arm the refresh timer, replacing any pending one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_token_auto_refresh(&self, expires_in_secs: i64) {
        let delay = self.inner.timing.delay_for(expires_in_secs);
        // Held until the new task is stored so concurrent re-arms stay ordered
        let mut timer = self.inner.timer.lock();
        let epoch = self.next_epoch();
        let task = tokio::spawn(run_refresh_loop(
            RefreshTask {
                api: self.inner.api.clone(),
                store: self.inner.store.clone(),
                hook: self.inner.hook.clone(),
                timing: self.inner.timing,
                epoch: self.inner.epoch.clone(),
                armed_at: epoch,
            },
            delay,
        ));

        if let Some(previous) = timer.replace(task) {
            previous.abort();
        }
        tracing::debug!("Token refresh scheduled in {}s", delay.as_secs());
    }

    /// Cancel the pending refresh. A refresh already in flight will not
    /// write its tokens once this returns.
    pub fn stop_token_auto_refresh(&self) {
        self.next_epoch();
        if let Some(task) = self.inner.timer.lock().take() {
            task.abort();
            tracing::debug!("Token refresh timer stopped");
        }
    }

    pub fn is_refresh_scheduled(&self) -> bool {
        self.inner
            .timer
            .lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    pub fn set_unauthorized_handler(&self, handler: Option<UnauthorizedHandler>) {
        self.inner.hook.set(handler);
    }

    /// Report a credential rejection to the registered handler
    pub fn handle_unauthorized(&self) -> bool {
        self.inner.hook.notify()
    }

    fn next_epoch(&self) -> u64 {
        let mut epoch = self.inner.epoch.lock();
        *epoch += 1;
        *epoch
    }
}

struct RefreshTask {
    api: Arc<dyn AuthApi>,
    store: TokenStore,
    hook: UnauthorizedHook,
    timing: RefreshTiming,
    epoch: Arc<Mutex<u64>>,
    armed_at: u64,
}

impl RefreshTask {
    fn is_current(&self) -> bool {
        *self.epoch.lock() == self.armed_at
    }

    fn end_session(&self) {
        if self.is_current() {
            self.hook.notify();
        }
    }
}

async fn run_refresh_loop(task: RefreshTask, mut delay: Duration) {
    loop {
        tokio::time::sleep(delay).await;

        let Some(refresh_token) = task.store.get_refresh_token() else {
            tracing::warn!("Refresh timer fired without a refresh token, ending session");
            task.end_session();
            return;
        };

        match task.api.refresh_token(&refresh_token).await {
            Ok(response) => {
                // The epoch lock is held across the write so a concurrent stop
                // cannot land between the check and the save
                let saved = {
                    let epoch = task.epoch.lock();
                    if *epoch == task.armed_at {
                        let preference = task.store.get_storage_preference();
                        task.store.save_tokens(NewTokens {
                            access_token: response.access_token,
                            refresh_token: response.refresh_token.unwrap_or(refresh_token),
                            expires_in: response.expires_in,
                            preference,
                        });
                    }
                    *epoch == task.armed_at
                };
                if !saved {
                    tracing::debug!("Refresh timer stopped mid-flight, discarding new tokens");
                    return;
                }
                delay = task.timing.delay_for(response.expires_in);
                tracing::info!("Access token refreshed, next refresh in {}s", delay.as_secs());
            }
            Err(e) => {
                // A failed refresh ends the session; no retry
                tracing::warn!("Token refresh failed, ending session: {}", e);
                task.end_session();
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::StoragePreference;
    use crate::auth::testing::StubAuthApi;
    use crate::auth::api::RefreshResponse;
    use crate::storage::StorageMedia;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn timing(lead: u64, min_delay: u64) -> RefreshTiming {
        RefreshTiming {
            lead: Duration::from_secs(lead),
            min_delay: Duration::from_secs(min_delay),
        }
    }

    fn guard_with(api: Arc<StubAuthApi>, timing: RefreshTiming) -> (TransportGuard, TokenStore) {
        let store = TokenStore::new(StorageMedia::in_memory());
        store.save_tokens(NewTokens {
            access_token: "acc1".to_string(),
            refresh_token: "ref1".to_string(),
            expires_in: 5,
            preference: StoragePreference::Local,
        });
        let guard = TransportGuard::new(api, store.clone(), UnauthorizedHook::new(), timing);
        (guard, store)
    }

    fn counting_handler(guard: &TransportGuard) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        guard.set_unauthorized_handler(Some(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));
        count
    }

    #[test]
    fn test_delay_for_respects_lead_and_minimum() {
        let timing = timing(2, 1);
        assert_eq!(timing.delay_for(5), Duration::from_secs(3));
        assert_eq!(timing.delay_for(2), Duration::from_secs(1));
        assert_eq!(timing.delay_for(-10), Duration::from_secs(1));
    }

    #[test]
    fn test_hook_replaces_and_clears_handler() {
        let hook = UnauthorizedHook::new();
        assert!(!hook.notify());

        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let f = first.clone();
        hook.set(Some(Arc::new(move || {
            f.fetch_add(1, Ordering::SeqCst);
        })));
        let s = second.clone();
        hook.set(Some(Arc::new(move || {
            s.fetch_add(1, Ordering::SeqCst);
        })));

        assert!(hook.notify());
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        hook.set(None);
        assert!(!hook.notify());
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_may_clear_its_own_slot() {
        let hook = UnauthorizedHook::new();
        let inner = hook.clone();
        hook.set(Some(Arc::new(move || inner.set(None))));

        assert!(hook.notify());
        assert!(!hook.is_set());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_invokes_handler_once() {
        let api = Arc::new(StubAuthApi::new());
        let (guard, _store) = guard_with(api.clone(), timing(2, 1));
        let count = counting_handler(&guard);

        guard.start_token_auto_refresh(5);

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(api.refresh_calls(), 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.refresh_calls(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!guard.is_refresh_scheduled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_refresh_saves_and_reschedules() {
        let api = Arc::new(StubAuthApi::new());
        api.push_refresh(RefreshResponse {
            access_token: "acc2".to_string(),
            expires_in: 10,
            refresh_token: Some("ref2".to_string()),
        });
        let (guard, store) = guard_with(api.clone(), timing(2, 1));
        let count = counting_handler(&guard);

        guard.start_token_auto_refresh(5);
        tokio::time::sleep(Duration::from_secs(4)).await;

        assert_eq!(store.get_access_token().as_deref(), Some("acc2"));
        assert_eq!(store.get_refresh_token().as_deref(), Some("ref2"));
        assert_eq!(store.get_storage_preference(), StoragePreference::Local);
        assert!(guard.is_refresh_scheduled());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // Next refresh at 3s + 8s; the stub has nothing queued so it fails
        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(api.refresh_calls(), 2);
        assert_eq!(api.refresh_tokens_seen(), vec!["ref1".to_string(), "ref2".to_string()]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_keeps_old_refresh_token_without_rotation() {
        let api = Arc::new(StubAuthApi::new());
        api.push_refresh(RefreshResponse {
            access_token: "acc2".to_string(),
            expires_in: 600,
            refresh_token: None,
        });
        let (guard, store) = guard_with(api, timing(2, 1));

        guard.start_token_auto_refresh(5);
        tokio::time::sleep(Duration::from_secs(4)).await;

        assert_eq!(store.get_access_token().as_deref(), Some("acc2"));
        assert_eq!(store.get_refresh_token().as_deref(), Some("ref1"));
        guard.stop_token_auto_refresh();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearming_cancels_previous_timer() {
        let api = Arc::new(StubAuthApi::new());
        let (guard, _store) = guard_with(api.clone(), timing(2, 1));
        let count = counting_handler(&guard);

        guard.start_token_auto_refresh(5);
        guard.start_token_auto_refresh(100);

        tokio::time::sleep(Duration::from_secs(50)).await;
        assert_eq!(api.refresh_calls(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(50)).await;
        assert_eq!(api.refresh_calls(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let api = Arc::new(StubAuthApi::new());
        let (guard, _store) = guard_with(api.clone(), timing(2, 1));

        guard.stop_token_auto_refresh();
        guard.start_token_auto_refresh(5);
        assert!(guard.is_refresh_scheduled());
        guard.stop_token_auto_refresh();
        guard.stop_token_auto_refresh();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(api.refresh_calls(), 0);
        assert!(!guard.is_refresh_scheduled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_during_refresh_discards_new_tokens() {
        let api = Arc::new(StubAuthApi::new());
        api.push_refresh(RefreshResponse {
            access_token: "acc2".to_string(),
            expires_in: 600,
            refresh_token: Some("ref2".to_string()),
        });
        let (guard, store) = guard_with(api.clone(), timing(2, 1));
        let count = counting_handler(&guard);

        // Sign-out lands while the refresh call is answering
        let teardown_guard = guard.clone();
        let teardown_store = store.clone();
        api.on_refresh(Arc::new(move || {
            teardown_guard.stop_token_auto_refresh();
            teardown_store.clear_tokens();
        }));

        guard.start_token_auto_refresh(5);
        tokio::time::sleep(Duration::from_secs(4)).await;

        assert_eq!(api.refresh_calls(), 1);
        assert_eq!(store.get_access_token(), None);
        assert_eq!(store.get_refresh_token(), None);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!guard.is_refresh_scheduled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_refresh_token_ends_session() {
        let api = Arc::new(StubAuthApi::new());
        let (guard, store) = guard_with(api.clone(), timing(2, 1));
        let count = counting_handler(&guard);
        store.clear_tokens();

        guard.start_token_auto_refresh(5);
        tokio::time::sleep(Duration::from_secs(4)).await;

        assert_eq!(api.refresh_calls(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
