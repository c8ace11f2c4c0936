//! In-memory storage medium

use crate::error::{Error, Result};
use crate::storage::StorageMedium;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Process-scoped storage, gone when the process exits
pub struct MemoryStorage {
    name: String,
    items: Mutex<HashMap<String, String>>,
    /// Total bytes (keys + values) allowed, if limited
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::named("memory")
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            items: Mutex::new(HashMap::new()),
            quota: None,
        }
    }

    /// Storage that refuses writes beyond `limit` bytes
    pub fn with_quota(name: &str, limit: usize) -> Self {
        Self {
            quota: Some(limit),
            ..Self::named(name)
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageMedium for MemoryStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock();

        if let Some(limit) = self.quota {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > limit {
                return Err(Error::StorageQuota {
                    medium: self.name.clone(),
                    needed,
                    limit,
                });
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.lock().remove(key);
        Ok(())
    }
}
