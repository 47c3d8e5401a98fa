use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use jobman_cache::{Cache, CacheError};

/// An in-process stand-in for [`jobman_cache::HttpCache`].
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.entries.lock().expect("poisoned").insert(key.to_string(), bytes.into());
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.lock().expect("poisoned").contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        self.entries
            .lock()
            .expect("poisoned")
            .get(key)
            .cloned()
            .ok_or(CacheError::NotCached)
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), CacheError> {
        self.entries.lock().expect("poisoned").insert(key.to_string(), bytes);
        Ok(())
    }
}
