use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jobman_cache::Cache;
use jobman_lockstore::LockStore;
use tracing::{info, warn};

use crate::responses::{DispatchError, ErrorsResponse, JobsResponse};
use crate::AppState;

/// `GET /job/{path}`: error check → cache check → enqueue. See spec.md 4.6.
pub async fn get_job(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    match dispatch(&state, &path).await {
        Ok(Some(bytes)) => (StatusCode::OK, bytes).into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(DispatchError::NotParseable(err)) => {
            (StatusCode::NOT_FOUND, err.to_string()).into_response()
        }
        Err(DispatchError::LiveError { job, status, message }) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, format!("{job} returned {message}")).into_response()
        }
        Err(DispatchError::Transport(err)) => {
            warn!(path, error = %err, "dispatcher transport error");
            (StatusCode::SERVICE_UNAVAILABLE, err).into_response()
        }
    }
}

/// Steps 1-4 of spec.md 4.6, factored out so tests can assert on the typed
/// outcome instead of parsing an HTTP response.
async fn dispatch(state: &AppState, path: &str) -> Result<Option<Vec<u8>>, DispatchError> {
    match state.cache.get(path).await {
        Ok(bytes) => return Ok(Some(bytes)),
        Err(jobman_cache::CacheError::NotCached) => {}
        Err(err) => return Err(DispatchError::Transport(err.to_string())),
    }

    let chain = jobman_protocol::chain(path).map_err(DispatchError::NotParseable)?;

    for job in &chain {
        if let Some(error) = state
            .lock_store
            .get_error(job)
            .await
            .map_err(|err| DispatchError::Transport(err.to_string()))?
        {
            return Err(DispatchError::LiveError {
                job: job.clone(),
                status: error.status,
                message: error.message,
            });
        }
    }

    let handler = state.handler.clone();
    info!(path, chain_len = chain.len(), "scheduling job handler");
    tokio::spawn(async move {
        if let Err(err) = handler.handle(chain).await {
            warn!(error = %err, "job handler exited with an error");
        }
    });

    Ok(None)
}

/// `GET /job/`: `{"jobs": [<job-path>, ...]}`.
pub async fn list_jobs(State(state): State<AppState>) -> Response {
    match state.lock_store.jobs().await {
        Ok(jobs) => Json(JobsResponse { jobs }).into_response(),
        Err(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response(),
    }
}

/// `GET /errors/`: `{"errors": {<job-path>: {code, message}, ...}}`.
pub async fn list_errors(State(state): State<AppState>) -> Response {
    match state.lock_store.errors().await {
        Ok(errors) => Json(ErrorsResponse::from(errors)).into_response(),
        Err(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response(),
    }
}

/// `GET /errors/purge/`: clears every error flag, returns `204`.
pub async fn purge_errors(State(state): State<AppState>) -> Response {
    match state.lock_store.clear_errors().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response(),
    }
}
