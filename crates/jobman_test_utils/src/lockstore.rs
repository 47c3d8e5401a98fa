use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jobman_lockstore::{LockStore, LockStoreError};
use jobman_protocol::ErrorRecord;

#[derive(Default)]
struct SharedState {
    locked: HashSet<String>,
    errors: HashMap<String, ErrorRecord>,
}

/// An in-process stand-in for [`jobman_lockstore::RedisLockStore`]: same
/// try-lock/unlock/error semantics, backed by a `Mutex<HashSet/HashMap>`
/// instead of a Redis connection. TTLs are not enforced; tests that care
/// about expiry exercise `RedisLockStore` directly against a real backend.
///
/// `locked` and `errors` live behind a shared `Arc`, standing in for the one
/// store every coordinator in a deployment talks to. `held` is per-instance
/// and never shared: `new_session` hands back a fresh `InMemoryLockStore`
/// pointed at the same `shared`, but with its own empty `held` set, matching
/// `RedisLockStore`'s real session semantics.
pub struct InMemoryLockStore {
    shared: Arc<Mutex<SharedState>>,
    held: Mutex<HashSet<String>>,
}

impl Default for InMemoryLockStore {
    fn default() -> Self {
        Self {
            shared: Arc::new(Mutex::new(SharedState::default())),
            held: Mutex::new(HashSet::new()),
        }
    }
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `job` on behalf of some other client, so tests can simulate a
    /// peer holding it without going through this store's own `try_lock`.
    pub fn seed_peer_lock(&self, job: &str) {
        self.shared.lock().expect("poisoned").locked.insert(job.to_string());
    }

    pub fn is_locked(&self, job: &str) -> bool {
        self.shared.lock().expect("poisoned").locked.contains(job)
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    fn new_session(&self) -> Arc<dyn LockStore> {
        Arc::new(InMemoryLockStore {
            shared: self.shared.clone(),
            held: Mutex::new(HashSet::new()),
        })
    }

    async fn try_lock(&self, job: &str) -> Result<bool, LockStoreError> {
        let mut shared = self.shared.lock().expect("poisoned");
        if shared.locked.contains(job) {
            return Ok(false);
        }
        shared.locked.insert(job.to_string());
        drop(shared);
        self.held.lock().expect("poisoned").insert(job.to_string());
        Ok(true)
    }

    async fn unlock(&self, job: &str) -> Result<bool, LockStoreError> {
        if !self.held.lock().expect("poisoned").remove(job) {
            return Ok(false);
        }
        self.shared.lock().expect("poisoned").locked.remove(job);
        Ok(true)
    }

    async fn force_unlock(&self, job: &str) -> Result<(), LockStoreError> {
        self.held.lock().expect("poisoned").remove(job);
        self.shared.lock().expect("poisoned").locked.remove(job);
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), LockStoreError> {
        let held: Vec<String> = self.held.lock().expect("poisoned").drain().collect();
        let mut shared = self.shared.lock().expect("poisoned");
        for job in held {
            shared.locked.remove(&job);
        }
        Ok(())
    }

    async fn jobs(&self) -> Result<Vec<String>, LockStoreError> {
        Ok(self.shared.lock().expect("poisoned").locked.iter().cloned().collect())
    }

    async fn get_error(&self, job: &str) -> Result<Option<ErrorRecord>, LockStoreError> {
        Ok(self.shared.lock().expect("poisoned").errors.get(job).cloned())
    }

    async fn set_error(&self, job: &str, status: u16, message: &str) -> Result<(), LockStoreError> {
        self.shared
            .lock()
            .expect("poisoned")
            .errors
            .insert(job.to_string(), ErrorRecord::new(status, message));
        Ok(())
    }

    async fn errors(&self) -> Result<HashMap<String, ErrorRecord>, LockStoreError> {
        Ok(self.shared.lock().expect("poisoned").errors.clone())
    }

    async fn clear_errors(&self) -> Result<(), LockStoreError> {
        self.shared.lock().expect("poisoned").errors.clear();
        Ok(())
    }

    async fn close(&self) -> Result<(), LockStoreError> {
        Ok(())
    }
}
