//! Blob cache abstraction: `exists`/`get`/`put` over a remote key→bytes
//! store. See spec.md section 4.3.

mod http_cache;

use async_trait::async_trait;
use thiserror::Error;

pub use http_cache::HttpCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("key not cached")]
    NotCached,
    #[error("cache transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("cache returned unexpected status {status} for {key}")]
    UnexpectedStatus { key: String, status: u16 },
}

/// Abstracts a remote blob store. The backend may be a simple REST file
/// service (`HEAD`/`GET`/`POST` on `<base>/<key>`); a non-2xx on `GET` other
/// than 404 is a [`CacheError::UnexpectedStatus`], not a
/// [`CacheError::NotCached`].
#[async_trait]
pub trait Cache: Send + Sync {
    /// Cheap existence check (should be backed by `HEAD`, not `GET`).
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Fetch the cached bytes for `key`, or [`CacheError::NotCached`].
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError>;

    /// Store `bytes` under `key`.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), CacheError>;
}
