//! Cached user record, stored next to the tokens

use crate::auth::models::{SessionUser, StoragePreference};
use crate::storage::{StorageMedia, StorageMedium};

pub const USER_KEY: &str = "mcn_auth.user";

#[derive(Clone)]
pub struct UserCache {
    media: StorageMedia,
}

impl UserCache {
    pub fn new(media: StorageMedia) -> Self {
        Self { media }
    }

    /// Write the user to the preferred medium and clear the other one
    pub fn save_user(&self, user: &SessionUser, preference: StoragePreference) {
        let json = match serde_json::to_string(user) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize user {}: {}", user.id, e);
                return;
            }
        };

        let (target, other) = match preference {
            StoragePreference::Local => (&self.media.local, &self.media.session),
            StoragePreference::Session => (&self.media.session, &self.media.local),
        };
        if let Err(e) = target.set_item(USER_KEY, &json) {
            tracing::warn!("Failed to save user to {} storage: {}", target.name(), e);
        }
        if let Err(e) = other.remove_item(USER_KEY) {
            tracing::warn!("Failed to clear user from {} storage: {}", other.name(), e);
        }
    }

    pub fn load_user(&self) -> Option<SessionUser> {
        read_user(self.media.local.as_ref()).or_else(|| read_user(self.media.session.as_ref()))
    }

    pub fn clear_user(&self) {
        for medium in [&self.media.local, &self.media.session] {
            if let Err(e) = medium.remove_item(USER_KEY) {
                tracing::warn!("Failed to clear user from {} storage: {}", medium.name(), e);
            }
        }
    }
}

fn read_user(medium: &dyn StorageMedium) -> Option<SessionUser> {
    let raw = match medium.get_item(USER_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::warn!("Failed to read user from {} storage: {}", medium.name(), e);
            return None;
        }
    };
    serde_json::from_str(&raw)
        .map_err(|e| tracing::debug!("Ignoring malformed user in {} storage: {}", medium.name(), e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> SessionUser {
        SessionUser {
            id: "u1".to_string(),
            name: "Alice".to_string(),
            phone: "13800000000".to_string(),
            roles: vec![],
            modules: vec!["dashboard".to_string()],
        }
    }

    #[test]
    fn test_save_and_load() {
        let media = StorageMedia::in_memory();
        let cache = UserCache::new(media.clone());
        cache.save_user(&alice(), StoragePreference::Local);

        assert_eq!(cache.load_user(), Some(alice()));
        assert!(media.session.get_item(USER_KEY).unwrap().is_none());
    }

    #[test]
    fn test_switching_medium_clears_old_copy() {
        let media = StorageMedia::in_memory();
        let cache = UserCache::new(media.clone());
        cache.save_user(&alice(), StoragePreference::Local);
        cache.save_user(&alice(), StoragePreference::Session);

        assert!(media.local.get_item(USER_KEY).unwrap().is_none());
        assert_eq!(cache.load_user(), Some(alice()));
    }

    #[test]
    fn test_clear_and_malformed() {
        let media = StorageMedia::in_memory();
        let cache = UserCache::new(media.clone());
        cache.save_user(&alice(), StoragePreference::Session);
        cache.clear_user();
        assert_eq!(cache.load_user(), None);

        media.local.set_item(USER_KEY, "[1, 2]").unwrap();
        assert_eq!(cache.load_user(), None);
    }
}
