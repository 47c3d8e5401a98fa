use std::sync::Arc;
use std::time::Duration;

use jobman_cache::{Cache, CacheError};
use jobman_lockstore::{LockStore, LockStoreError};
use jobman_upstream::{UpstreamClient, UpstreamError};
use thiserror::Error;
use tracing::{info, warn};

use crate::scan::ScanOutcome;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("lock store error: {0}")]
    LockStore(#[from] LockStoreError),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),
}

/// The outcome of Phase B's wait loop.
enum PeerOutcome {
    /// The pending job's cache entry appeared; re-enter Phase A.
    Resumed,
    /// The peer failed or we waited past `max_retries`; give up on the chain.
    Abandoned,
}

/// Drives one job chain to completion, coordinating lock acquisition,
/// cache lookups, peer waiting, and upstream execution.
///
/// Grounded on the original `JobHandler` (`original_source/job_manager/job_handler.py`):
/// same four phases, but Phase B's "wait then recurse" becomes an iterative
/// loop here (spec.md section 9's redesign note), since unbounded recursion
/// through an async call is both awkward and unnecessary in Rust.
pub struct JobHandler {
    lock_store: Arc<dyn LockStore>,
    cache: Arc<dyn Cache>,
    upstream: Arc<dyn UpstreamClient>,
    max_retries: u32,
    retry_sleep: Duration,
    check_errors_every: u32,
}

impl JobHandler {
    pub fn new(
        lock_store: Arc<dyn LockStore>,
        cache: Arc<dyn Cache>,
        upstream: Arc<dyn UpstreamClient>,
        max_retries: u32,
        retry_sleep: Duration,
        check_errors_every: u32,
    ) -> Self {
        Self {
            lock_store,
            cache,
            upstream,
            max_retries,
            retry_sleep,
            check_errors_every,
        }
    }

    /// Drive `chain` (leaf-first, root-last, the output of
    /// `jobman_protocol::chain`) to completion. Phase D's cleanup always
    /// runs, even if an earlier phase returns an error.
    ///
    /// Opens its own lock store session at the start (`LockStore::new_session`)
    /// rather than using `self.lock_store` directly: `self.lock_store` is
    /// shared by every concurrently-running `handle` call on this handler
    /// instance, and its `held` set must not be. Each run's session shares
    /// the underlying connection but starts with an empty held-lock set, so
    /// this run's Phase D cleanup only releases locks this run acquired.
    pub async fn handle(&self, chain: Vec<String>) -> Result<(), HandlerError> {
        let lock_store = self.lock_store.new_session();
        let outcome = self.drive(&lock_store, &chain).await;

        let cleanup = lock_store.cleanup().await.map_err(HandlerError::from);
        let close = lock_store.close().await.map_err(HandlerError::from);

        if let Err(err) = &outcome {
            warn!(chain = ?chain, error = %err, "job chain handling failed");
        }

        outcome?;
        cleanup?;
        close?;
        Ok(())
    }

    /// Phases A-C. Loops because Phase B's "peer resumed" outcome re-enters
    /// Phase A from the top rather than recursing.
    async fn drive(&self, lock_store: &Arc<dyn LockStore>, chain: &[String]) -> Result<(), HandlerError> {
        loop {
            let scan = self.phase_a(lock_store, chain).await?;

            if scan.is_fully_satisfied() {
                self.phase_c(lock_store, scan.todo).await?;
                return Ok(());
            }

            if !scan.has_work() {
                // A peer owns the next dependency and we have nothing of
                // our own to do meanwhile: nothing useful to contribute.
                return Ok(());
            }

            let pending = scan.pending.expect("checked above");
            match self.phase_b(lock_store, &pending).await? {
                PeerOutcome::Resumed => {
                    // Release the locks this scan acquired before re-running
                    // Phase A, otherwise the re-scan's `try_lock` on those
                    // same jobs fails (we still hold them), each one reads as
                    // peer-held, and the chain is abandoned with nothing
                    // touched. Matches the original's `cleanup()` call before
                    // its recursive `handle_jobs` re-entry. Scoped to this
                    // run's session, so it still only touches this run's
                    // own locks.
                    lock_store.cleanup().await?;
                    continue;
                }
                PeerOutcome::Abandoned => return Ok(()),
            }
        }
    }

    /// Reverse (root-toward-leaf) lock-acquisition scan.
    async fn phase_a(&self, lock_store: &Arc<dyn LockStore>, chain: &[String]) -> Result<ScanOutcome, HandlerError> {
        let mut todo: Vec<String> = Vec::new();
        let mut pending: Option<String> = None;

        for job in chain.iter().rev() {
            let is_cached = self.cache.exists(job).await?;
            let locked = lock_store.try_lock(job).await?;

            if is_cached {
                if locked {
                    lock_store.unlock(job).await?;
                }
                break;
            } else if !locked {
                pending = Some(job.clone());
                break;
            } else {
                // Prepend: the scan walks root-to-leaf, but TODO must end
                // up leaf-to-root (the order Phase C executes in).
                todo.insert(0, job.clone());
            }
        }

        Ok(ScanOutcome { pending, todo })
    }

    /// Bounded wait for a peer-held dependency to resolve.
    async fn phase_b(&self, lock_store: &Arc<dyn LockStore>, pending: &str) -> Result<PeerOutcome, HandlerError> {
        for iteration in 1..=self.max_retries {
            if self.cache.exists(pending).await? {
                return Ok(PeerOutcome::Resumed);
            }

            if self.check_errors_every > 0 && iteration % self.check_errors_every == 0 {
                if lock_store.get_error(pending).await?.is_some() {
                    return Ok(PeerOutcome::Abandoned);
                }
            }

            tokio::time::sleep(self.retry_sleep).await;
        }

        Ok(PeerOutcome::Abandoned)
    }

    /// Leaf-to-root execution of every owned job.
    async fn phase_c(&self, lock_store: &Arc<dyn LockStore>, todo: Vec<String>) -> Result<(), HandlerError> {
        for job in todo {
            let touch = self.upstream.touch(&job).await?;

            if touch.is_success() {
                self.cache.put(&job, touch.body).await?;
                info!(job, "computed");
            } else {
                let message = String::from_utf8_lossy(&touch.body).into_owned();
                lock_store.set_error(&job, touch.status, &message).await?;
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use jobman_cache::Cache;
    use jobman_lockstore::LockStore;
    use jobman_test_utils::{FakeUpstream, InMemoryCache, InMemoryLockStore};
    use jobman_upstream::{TouchResult, UpstreamClient, UpstreamError};
    use tokio::sync::Notify;

    use super::JobHandler;

    fn handler(
        lock_store: Arc<InMemoryLockStore>,
        cache: Arc<InMemoryCache>,
        upstream: Arc<FakeUpstream>,
    ) -> JobHandler {
        JobHandler::new(lock_store, cache, upstream, 20, Duration::from_millis(10), 2)
    }

    #[tokio::test]
    async fn happy_path_two_task_chain() {
        let lock_store = Arc::new(InMemoryLockStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let upstream = Arc::new(FakeUpstream::new());
        upstream.script_ok("foo/1/2/3");
        upstream.script_ok("foo/a/b/c/1/2/3");

        let chain = vec!["foo/1/2/3".to_string(), "foo/a/b/c/1/2/3".to_string()];
        handler(lock_store.clone(), cache.clone(), upstream.clone())
            .handle(chain)
            .await
            .unwrap();

        assert_eq!(upstream.calls(), vec!["foo/1/2/3", "foo/a/b/c/1/2/3"]);
        assert!(cache.exists("foo/1/2/3").await.unwrap());
        assert!(cache.exists("foo/a/b/c/1/2/3").await.unwrap());
        assert!(lock_store.jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn partial_cache_skips_the_cached_prefix() {
        let lock_store = Arc::new(InMemoryLockStore::new());
        let cache = Arc::new(InMemoryCache::new());
        cache.seed("foo/x/y/z", b"already-done".to_vec());
        let upstream = Arc::new(FakeUpstream::new());
        upstream.script_ok("foo/1/2/3/x/y/z");
        upstream.script_ok("foo/a/b/c/1/2/3/x/y/z");

        let chain = vec![
            "foo/x/y/z".to_string(),
            "foo/1/2/3/x/y/z".to_string(),
            "foo/a/b/c/1/2/3/x/y/z".to_string(),
        ];
        handler(lock_store.clone(), cache.clone(), upstream.clone())
            .handle(chain)
            .await
            .unwrap();

        assert_eq!(upstream.calls(), vec!["foo/1/2/3/x/y/z", "foo/a/b/c/1/2/3/x/y/z"]);
        assert!(lock_store.jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_in_flight_does_no_work() {
        let lock_store = Arc::new(InMemoryLockStore::new());
        lock_store.seed_peer_lock("foo/al/ready/requested");
        let cache = Arc::new(InMemoryCache::new());
        let upstream = Arc::new(FakeUpstream::new());

        let chain = vec!["foo/al/ready/requested".to_string()];
        handler(lock_store.clone(), cache.clone(), upstream.clone())
            .handle(chain)
            .await
            .unwrap();

        assert!(upstream.calls().is_empty());
        assert!(lock_store.is_locked("foo/al/ready/requested"));
    }

    #[tokio::test]
    async fn waits_for_peer_then_resumes_on_its_own_prefix() {
        let lock_store = Arc::new(InMemoryLockStore::new());
        lock_store.seed_peer_lock("foo/pre/existing/job");
        let cache = Arc::new(InMemoryCache::new());
        let upstream = Arc::new(FakeUpstream::new());
        upstream.script_ok("foo/1/2/3/pre/existing/job");

        let peer_cache = cache.clone();
        let peer_lock_store = lock_store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            peer_cache.seed("foo/pre/existing/job", b"peer-result".to_vec());
            peer_lock_store.force_unlock("foo/pre/existing/job").await.unwrap();
        });

        let chain = vec![
            "foo/pre/existing/job".to_string(),
            "foo/1/2/3/pre/existing/job".to_string(),
        ];
        handler(lock_store.clone(), cache.clone(), upstream.clone())
            .handle(chain)
            .await
            .unwrap();

        assert_eq!(upstream.calls(), vec!["foo/1/2/3/pre/existing/job"]);
    }

    #[tokio::test]
    async fn upstream_failure_sets_an_error_flag_and_stops() {
        let lock_store = Arc::new(InMemoryLockStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let upstream = Arc::new(FakeUpstream::new());
        upstream.script("foo/i/will/break", 500, b"broken".to_vec());

        let chain = vec!["foo/i/will/break".to_string()];
        handler(lock_store.clone(), cache.clone(), upstream.clone())
            .handle(chain)
            .await
            .unwrap();

        let error = lock_store.get_error("foo/i/will/break").await.unwrap().unwrap();
        assert_eq!(error.status, 500);
        assert_eq!(error.message, "broken");
        assert!(!cache.exists("foo/i/will/break").await.unwrap());
        assert!(lock_store.jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_stops_dependents_from_running() {
        let lock_store = Arc::new(InMemoryLockStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let upstream = Arc::new(FakeUpstream::new());
        upstream.script("foo/i/will/break", 500, b"broken".to_vec());
        upstream.script_ok("foo/a/b/c/i/will/break");

        let chain = vec!["foo/i/will/break".to_string(), "foo/a/b/c/i/will/break".to_string()];
        handler(lock_store.clone(), cache.clone(), upstream.clone())
            .handle(chain)
            .await
            .unwrap();

        assert_eq!(upstream.calls(), vec!["foo/i/will/break"]);
        assert!(lock_store.jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_task_chain_leaf_and_root_coincide() {
        let lock_store = Arc::new(InMemoryLockStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let upstream = Arc::new(FakeUpstream::new());
        upstream.script_ok("foo/a/b/c");

        handler(lock_store.clone(), cache.clone(), upstream.clone())
            .handle(vec!["foo/a/b/c".to_string()])
            .await
            .unwrap();

        assert_eq!(upstream.calls(), vec!["foo/a/b/c"]);
    }

    #[tokio::test]
    async fn fully_cached_chain_does_no_upstream_work() {
        let lock_store = Arc::new(InMemoryLockStore::new());
        let cache = Arc::new(InMemoryCache::new());
        cache.seed("foo/a/b/c", b"done".to_vec());
        cache.seed("foo/x/y/z/a/b/c", b"done".to_vec());
        let upstream = Arc::new(FakeUpstream::new());

        let chain = vec!["foo/a/b/c".to_string(), "foo/x/y/z/a/b/c".to_string()];
        handler(lock_store.clone(), cache.clone(), upstream.clone())
            .handle(chain)
            .await
            .unwrap();

        assert!(upstream.calls().is_empty());
        assert!(lock_store.jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fully_peer_held_chain_returns_immediately() {
        let lock_store = Arc::new(InMemoryLockStore::new());
        lock_store.seed_peer_lock("foo/a/b/c");
        lock_store.seed_peer_lock("foo/x/y/z/a/b/c");
        let cache = Arc::new(InMemoryCache::new());
        let upstream = Arc::new(FakeUpstream::new());

        let chain = vec!["foo/a/b/c".to_string(), "foo/x/y/z/a/b/c".to_string()];
        handler(lock_store.clone(), cache.clone(), upstream.clone())
            .handle(chain)
            .await
            .unwrap();

        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn peer_timeout_abandons_without_a_new_error_flag() {
        let lock_store = Arc::new(InMemoryLockStore::new());
        lock_store.seed_peer_lock("foo/never/shows/up");
        let cache = Arc::new(InMemoryCache::new());
        let upstream = Arc::new(FakeUpstream::new());
        upstream.script_ok("foo/1/2/3/never/shows/up");

        let chain = vec!["foo/never/shows/up".to_string(), "foo/1/2/3/never/shows/up".to_string()];
        JobHandler::new(lock_store.clone(), cache.clone(), upstream.clone(), 3, Duration::from_millis(5), 2)
            .handle(chain)
            .await
            .unwrap();

        assert!(upstream.calls().is_empty());
        assert!(lock_store.get_error("foo/never/shows/up").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn peer_failure_abandons_the_chain() {
        let lock_store = Arc::new(InMemoryLockStore::new());
        lock_store.seed_peer_lock("foo/peer/will/fail");
        lock_store.set_error("foo/peer/will/fail", 500, "boom").await.unwrap();
        let cache = Arc::new(InMemoryCache::new());
        let upstream = Arc::new(FakeUpstream::new());
        upstream.script_ok("foo/1/2/3/peer/will/fail");

        let chain = vec!["foo/peer/will/fail".to_string(), "foo/1/2/3/peer/will/fail".to_string()];
        JobHandler::new(lock_store.clone(), cache.clone(), upstream.clone(), 10, Duration::from_millis(5), 1)
            .handle(chain)
            .await
            .unwrap();

        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn cleanup_releases_every_lock_this_handler_acquired() {
        let lock_store = Arc::new(InMemoryLockStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let upstream = Arc::new(FakeUpstream::new());
        upstream.script_ok("foo/1/2/3");

        handler(lock_store.clone(), cache.clone(), upstream.clone())
            .handle(vec!["foo/1/2/3".to_string()])
            .await
            .unwrap();

        assert!(lock_store.jobs().await.unwrap().is_empty());
    }

    /// An upstream double that blocks on one specific path until released,
    /// so a test can hold a handler mid-`handle()` (lock acquired, touch in
    /// flight) while driving a second, unrelated `handle()` run to
    /// completion on the same store.
    struct BlockingUpstream {
        blocked_path: String,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl UpstreamClient for BlockingUpstream {
        async fn touch(&self, path: &str) -> Result<TouchResult, UpstreamError> {
            if path == self.blocked_path {
                self.gate.notified().await;
            }
            Ok(TouchResult { status: 200, body: Vec::new() })
        }
    }

    #[tokio::test]
    async fn concurrent_handlers_do_not_release_each_others_locks() {
        let lock_store = Arc::new(InMemoryLockStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let gate = Arc::new(Notify::new());
        let upstream = Arc::new(BlockingUpstream {
            blocked_path: "foo/slow/job/here".to_string(),
            gate: gate.clone(),
        });

        let handler = Arc::new(JobHandler::new(
            lock_store.clone(),
            cache.clone(),
            upstream,
            20,
            Duration::from_millis(10),
            2,
        ));

        let slow_handler = handler.clone();
        let slow_run = tokio::spawn(async move {
            slow_handler.handle(vec!["foo/slow/job/here".to_string()]).await.unwrap();
        });

        // Give the slow run time to acquire its lock and block inside touch().
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(lock_store.is_locked("foo/slow/job/here"));

        // A second, unrelated run on the same handler instance completes
        // fully (and runs its own Phase D cleanup) while the slow run is
        // still mid-flight. Its cleanup must only release its own session's
        // locks, never the slow run's.
        handler.handle(vec!["foo/fast/job/here".to_string()]).await.unwrap();
        assert!(lock_store.is_locked("foo/slow/job/here"));

        gate.notify_one();
        slow_run.await.unwrap();
        assert!(!lock_store.is_locked("foo/slow/job/here"));
    }
}
