use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use jobman_upstream::{TouchResult, UpstreamClient, UpstreamError};

/// A scriptable [`UpstreamClient`] double. Each path is wired to a queue of
/// responses consumed in order; calling `touch` past the end of a path's
/// queue repeats its last response, so a single `script` call covers both
/// fixed-response and retry-then-succeed scenarios.
#[derive(Default)]
pub struct FakeUpstream {
    scripts: Mutex<HashMap<String, Vec<TouchResult>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a single (status, body) response for `path`.
    pub fn script(&self, path: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.scripts
            .lock()
            .expect("poisoned")
            .entry(path.to_string())
            .or_default()
            .push(TouchResult { status, body: body.into() });
    }

    /// Queue a plain 200 response with an empty body for `path`.
    pub fn script_ok(&self, path: &str) {
        self.script(path, 200, Vec::new());
    }

    /// The paths touched so far, in call order (includes repeats).
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("poisoned").clone()
    }

    pub fn call_count(&self, path: &str) -> usize {
        self.calls().iter().filter(|p| p.as_str() == path).count()
    }
}

#[async_trait]
impl UpstreamClient for FakeUpstream {
    async fn touch(&self, path: &str) -> Result<TouchResult, UpstreamError> {
        self.calls.lock().expect("poisoned").push(path.to_string());

        let mut scripts = self.scripts.lock().expect("poisoned");
        let queue = scripts.entry(path.to_string()).or_insert_with(|| vec![TouchResult { status: 200, body: Vec::new() }]);

        if queue.len() > 1 {
            Ok(queue.remove(0))
        } else {
            Ok(queue[0].clone())
        }
    }
}
