//! Key-value storage media backing the session
//!
//! Two media mirror the browser's Web Storage split: a durable medium that
//! survives restarts (`FileStorage`) and a process-scoped one (`MemoryStorage`).

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::Result;
use std::sync::Arc;

/// A string key-value store
pub trait StorageMedium: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&self, key: &str) -> Result<()>;
}

/// The pair of media a session can live in
#[derive(Clone)]
pub struct StorageMedia {
    pub local: Arc<dyn StorageMedium>,
    pub session: Arc<dyn StorageMedium>,
}

impl StorageMedia {
    pub fn new(local: Arc<dyn StorageMedium>, session: Arc<dyn StorageMedium>) -> Self {
        Self { local, session }
    }

    /// Both media in memory, for tests and embedding
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStorage::named("local")),
            Arc::new(MemoryStorage::named("session")),
        )
    }
}
