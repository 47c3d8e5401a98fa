use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::{TouchResult, UpstreamClient, UpstreamError};

/// Reqwest-backed router client with a bounded per-request timeout.
///
/// Grounded on `casparian_security::azure::AzureProvider`'s single shared
/// `reqwest::Client`, here configured with `.timeout()` since a hung router
/// must not hang the whole job chain (spec.md 4.4, 8 scenario 5).
pub struct HttpUpstream {
    base_url: String,
    client: Client,
}

impl HttpUpstream {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn touch(&self, path: &str) -> Result<TouchResult, UpstreamError> {
        let url = format!(
            "{}/{}?touch=true",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        match self.client.get(&url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.bytes().await?.to_vec();
                debug!(path, status, "touched upstream");
                Ok(TouchResult { status, body })
            }
            Err(err) if err.is_timeout() => {
                debug!(path, "upstream touch timed out");
                Ok(TouchResult {
                    status: 503,
                    body: format!("{path} timed out").into_bytes(),
                })
            }
            Err(err) => Err(UpstreamError::Transport(err)),
        }
    }
}
