//! Lock store abstraction: distributed locks and error flags over a shared
//! key-value store.
//!
//! Mirrors `casparian_state_store::StateStore`'s polymorphism-over-backend
//! shape (a thin handle delegating to a trait object), but the trait here
//! is the public surface directly: callers hold an `Arc<dyn LockStore>`.

mod redis_store;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use jobman_protocol::ErrorRecord;
use thiserror::Error;

pub use redis_store::RedisLockStore;

#[derive(Debug, Error)]
pub enum LockStoreError {
    #[error("lock store transport error: {0}")]
    Transport(#[from] redis::RedisError),
}

/// Abstracts a remote key-value store supporting set-if-absent-with-TTL,
/// delete, get, and key-scan, over two namespaces: `jobs` (locks) and
/// `errors` (failure flags). See spec.md section 4.2.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Open a new session against the same underlying store: same
    /// connection/backend, but its own, empty held-lock set. Per spec.md
    /// section 3, "a coordinator deletes only locks it itself successfully
    /// acquired (tracked by the handler instance)", and section 5, "the
    /// `held` set inside a handler is single-owner; never shared". Every
    /// `JobHandler::handle` run opens one of these at the start, so its
    /// `cleanup()` only ever releases locks that run itself acquired, not
    /// locks belonging to some other concurrently-running handler sharing
    /// the same process-wide store.
    fn new_session(&self) -> Arc<dyn LockStore>;

    /// Atomic set-if-absent with TTL on `jobs:<job>`. True iff this call
    /// created the key; on success the job is added to this client's
    /// locally-held set.
    async fn try_lock(&self, job: &str) -> Result<bool, LockStoreError>;

    /// Delete `jobs:<job>`, but only if this client previously acquired it.
    /// Returns true iff the key was deleted.
    async fn unlock(&self, job: &str) -> Result<bool, LockStoreError>;

    /// Delete `jobs:<job>` unconditionally, bypassing the held-set check.
    /// Used for admin/reaping; does not require this client to own the lock.
    async fn force_unlock(&self, job: &str) -> Result<(), LockStoreError>;

    /// Unlock every lock this client instance currently holds. Idempotent.
    async fn cleanup(&self) -> Result<(), LockStoreError>;

    /// List every job with a currently-held lock (scans the `jobs:` prefix).
    async fn jobs(&self) -> Result<Vec<String>, LockStoreError>;

    /// Read `errors:<job>`, if present.
    async fn get_error(&self, job: &str) -> Result<Option<ErrorRecord>, LockStoreError>;

    /// Write `errors:<job>` with the given status/message, TTL'd at
    /// `ERROR_EXPIRY`.
    async fn set_error(&self, job: &str, status: u16, message: &str) -> Result<(), LockStoreError>;

    /// All currently live error flags, keyed by job path.
    async fn errors(&self) -> Result<HashMap<String, ErrorRecord>, LockStoreError>;

    /// Delete every key under the `errors:` prefix.
    async fn clear_errors(&self) -> Result<(), LockStoreError>;

    /// Release the underlying connection. Mandatory on shutdown.
    async fn close(&self) -> Result<(), LockStoreError>;
}
