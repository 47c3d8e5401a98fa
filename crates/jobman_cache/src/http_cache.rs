use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::{Cache, CacheError};

/// REST-profile cache client: `HEAD`/`GET`/`POST` against `<base>/<key>`.
///
/// Grounded on `casparian_security::azure::AzureProvider`'s use of a single
/// `reqwest::Client` plus `.context`-style error propagation, adapted here
/// to `thiserror` since this crate's errors are part of a typed trait
/// contract rather than binary-level `anyhow` glue.
pub struct HttpCache {
    base_url: String,
    client: Client,
}

impl HttpCache {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

#[async_trait]
impl Cache for HttpCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let response = self.client.head(self.url_for(key)).send().await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(CacheError::UnexpectedStatus {
                key: key.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let response = self.client.get(self.url_for(key)).send().await?;
        match response.status() {
            status if status.is_success() => Ok(response.bytes().await?.to_vec()),
            StatusCode::NOT_FOUND => Err(CacheError::NotCached),
            status => Err(CacheError::UnexpectedStatus {
                key: key.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), CacheError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(key.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self.client.post(self.url_for(key)).multipart(form).send().await?;
        if response.status().is_success() {
            debug!(key, "cached artifact");
            Ok(())
        } else {
            Err(CacheError::UnexpectedStatus {
                key: key.to_string(),
                status: response.status().as_u16(),
            })
        }
    }
}
