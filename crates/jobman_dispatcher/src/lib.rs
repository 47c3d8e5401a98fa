//! Request dispatcher: the HTTP front door. See spec.md section 4.6 and 6.
//!
//! Grounded on `golem-cli`'s `serve_http_mcp` (`golem-cli/src/serve.rs`):
//! a small `axum::Router` built from a `Clone`-able `AppState` holding
//! `Arc`s to the real collaborators, wired with `.with_state(state)` and
//! served via `axum::serve`. `axum` itself is adopted from that crate per
//! SPEC_FULL.md section 1; the teacher has no HTTP front door of its own.

mod handlers;
mod responses;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use jobman_cache::Cache;
use jobman_handler::JobHandler;
use jobman_lockstore::LockStore;

/// Shared state handed to every route handler: `Arc` handles to the
/// collaborators plus the handler used to drive background job chains.
#[derive(Clone)]
pub struct AppState {
    pub lock_store: Arc<dyn LockStore>,
    pub cache: Arc<dyn Cache>,
    pub handler: Arc<JobHandler>,
}

impl AppState {
    pub fn new(lock_store: Arc<dyn LockStore>, cache: Arc<dyn Cache>, handler: Arc<JobHandler>) -> Self {
        Self { lock_store, cache, handler }
    }
}

/// Build the router exposing exactly the endpoints in spec.md section 6:
/// `GET /job/{path}`, `GET /job/`, `GET /errors/`, `GET /errors/purge/`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/job/", get(handlers::list_jobs))
        .route("/job/*path", get(handlers::get_job))
        .route("/errors/", get(handlers::list_errors))
        .route("/errors/purge/", get(handlers::purge_errors))
        .with_state(state)
}
