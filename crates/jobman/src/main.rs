//! Jobman binary: wires configuration, collaborators, the job handler, and
//! the HTTP front door together and serves them.
//!
//! Grounded on `casparian`'s `main.rs` shape (parse config, init tracing,
//! build the runtime's long-lived collaborators, run until a shutdown
//! signal), simplified to `tokio::signal::ctrl_c` plus `axum::serve`'s
//! `with_graceful_shutdown` since jobman has no split control/data-plane
//! runtime to tear down: one process, one HTTP front door.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use jobman_cache::HttpCache;
use jobman_config::Config;
use jobman_dispatcher::{router, AppState};
use jobman_handler::JobHandler;
use jobman_lockstore::RedisLockStore;
use jobman_upstream::HttpUpstream;
use tracing::info;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    jobman_logging::init_logging(&config.log_level);

    info!(bind_addr = %config.bind_addr, "starting jobman");

    let lock_store = Arc::new(
        RedisLockStore::connect(
            &config.redis_url(),
            config.redis_job_key_prefix.clone(),
            config.redis_error_key_prefix.clone(),
            config.job_expiry_secs,
            config.error_expiry_secs,
        )
        .await
        .context("connecting to the lock store")?,
    );

    let cache = Arc::new(HttpCache::new(config.data_cache_url.clone()));

    let upstream = Arc::new(
        HttpUpstream::new(config.router_url.clone(), UPSTREAM_TIMEOUT).context("building the upstream client")?,
    );

    let handler = Arc::new(JobHandler::new(
        lock_store.clone(),
        cache.clone(),
        upstream,
        config.max_retries,
        config.retry_sleep(),
        config.check_errors_every,
    ));

    let app = router(AppState::new(lock_store, cache, handler));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "jobman listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("received shutdown signal");
    }
}
