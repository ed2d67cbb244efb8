//! Capabilities the embedding host provides: storage, session, navigation preferences.

pub mod preferences;
pub mod session;
pub mod storage;

use preferences::NavPreferences;
use session::Session;
use std::path::Path;
use std::sync::Arc;
use storage::{FileStore, KeyValueStore, MemoryStore};

#[derive(Clone)]
pub struct HostEnvironment {
    store: Arc<dyn KeyValueStore>,
}

impl HostEnvironment {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn file_backed(path: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(Arc::new(FileStore::open(path)?)))
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }

    pub fn session(&self) -> Session {
        Session::new(self.store.clone())
    }

    pub fn preferences(&self) -> NavPreferences {
        NavPreferences::new(self.store.clone())
    }
}
