//! Upstream router client: touching a path asks the remote computation
//! service to (re)compute it. See spec.md section 4.4.

mod http_upstream;

use async_trait::async_trait;
use thiserror::Error;

pub use http_upstream::HttpUpstream;

/// The raw outcome of a touch: upstream's status line and body, verbatim.
/// A non-2xx status is not an error here: the handler decides what to do
/// with it (see `jobman_handler`). Only genuine transport failures (DNS,
/// connection refused, TLS) are [`UpstreamError`]; a timeout is folded into
/// a synthetic 503 so the handler's retry logic treats it uniformly with a
/// real 503 from the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchResult {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TouchResult {
    /// Exact equality with 200, per spec.md 4.5.2 step 2 ("If status ==
    /// 200") and the original's `if status == 200:` in `_do_jobs`; a
    /// 201/204 is not treated as success here.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Abstracts the remote router that actually runs a task's computation.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Ask upstream to compute `path`, returning its raw status and body.
    /// A bounded-timeout implementation should surface the timeout as a
    /// synthetic `503` rather than an [`UpstreamError`].
    async fn touch(&self, path: &str) -> Result<TouchResult, UpstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_exactly_200() {
        assert!(TouchResult { status: 200, body: vec![] }.is_success());
        assert!(!TouchResult { status: 201, body: vec![] }.is_success());
        assert!(!TouchResult { status: 204, body: vec![] }.is_success());
        assert!(!TouchResult { status: 404, body: vec![] }.is_success());
        assert!(!TouchResult { status: 503, body: vec![] }.is_success());
    }
}
