//! Token persistence over the local/session storage media
//!
//! Storage failures never escape this module: a medium that cannot be read or
//! written behaves as if it held no token, so the session degrades to
//! anonymous instead of failing.

use crate::auth::models::{NewTokens, StoragePreference, StoredTokens};
use crate::storage::{StorageMedia, StorageMedium};
use std::sync::Arc;

pub const TOKENS_KEY: &str = "mcn_auth.tokens";

/// Reads and writes the session token record
#[derive(Clone)]
pub struct TokenStore {
    media: StorageMedia,
}

impl TokenStore {
    pub fn new(media: StorageMedia) -> Self {
        Self { media }
    }

    /// Persist a token set to the preferred medium and clear the other one
    pub fn save_tokens(&self, tokens: NewTokens) {
        let record = StoredTokens {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: expiry_after(tokens.expires_in),
        };

        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize tokens: {}", e);
                return;
            }
        };

        let (target, other) = self.split(tokens.preference);
        if let Err(e) = target.set_item(TOKENS_KEY, &json) {
            tracing::warn!("Failed to save tokens to {} storage: {}", target.name(), e);
        }
        if let Err(e) = other.remove_item(TOKENS_KEY) {
            tracing::warn!("Failed to clear tokens from {} storage: {}", other.name(), e);
        }
    }

    pub fn get_access_token(&self) -> Option<String> {
        self.live_record().map(|r| r.access_token)
    }

    pub fn get_refresh_token(&self) -> Option<String> {
        self.live_record().map(|r| r.refresh_token)
    }

    /// Expiry as epoch milliseconds
    pub fn get_expires_at(&self) -> Option<i64> {
        self.live_record().map(|r| r.expires_at)
    }

    /// True when there is no token or it expires within `buffer_seconds`
    pub fn is_token_expired(&self, buffer_seconds: i64) -> bool {
        match self.get_expires_at() {
            Some(expires_at) => expiry_after(buffer_seconds) >= expires_at,
            None => true,
        }
    }

    /// Whole seconds left before expiry; `None` without a token
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.get_expires_at()
            .map(|expires_at| expires_at.saturating_sub(now_millis()) / 1000)
    }

    pub fn clear_tokens(&self) {
        for medium in [&self.media.local, &self.media.session] {
            if let Err(e) = medium.remove_item(TOKENS_KEY) {
                tracing::warn!("Failed to clear tokens from {} storage: {}", medium.name(), e);
            }
        }
    }

    /// Medium currently holding live tokens
    pub fn get_storage_preference(&self) -> StoragePreference {
        if read_record(self.media.local.as_ref()).is_some() {
            StoragePreference::Local
        } else {
            StoragePreference::Session
        }
    }

    fn live_record(&self) -> Option<StoredTokens> {
        read_record(self.media.local.as_ref())
            .or_else(|| read_record(self.media.session.as_ref()))
    }

    fn split(
        &self,
        preference: StoragePreference,
    ) -> (&Arc<dyn StorageMedium>, &Arc<dyn StorageMedium>) {
        match preference {
            StoragePreference::Local => (&self.media.local, &self.media.session),
            StoragePreference::Session => (&self.media.session, &self.media.local),
        }
    }
}

fn read_record(medium: &dyn StorageMedium) -> Option<StoredTokens> {
    let raw = match medium.get_item(TOKENS_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::warn!("Failed to read tokens from {} storage: {}", medium.name(), e);
            return None;
        }
    };

    match serde_json::from_str::<StoredTokens>(&raw) {
        Ok(record) if !record.access_token.is_empty() => Some(record),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Ignoring malformed token record in {} storage: {}", medium.name(), e);
            None
        }
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Epoch milliseconds `secs` from now, clamped at the `i64` range
fn expiry_after(secs: i64) -> i64 {
    now_millis().saturating_add(secs.saturating_mul(1000))
}
