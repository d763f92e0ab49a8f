use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{FetchConfig, Result};

/// Thin wrapper around a [`reqwest::Client`] carrying the shared transport
/// settings. Every request inherits the configured timeout, so a stuck
/// upstream surfaces as that item's transport error instead of stalling the
/// run.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }

    /// GET with query parameters, decoding the response body as JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        debug!(%url, "fetching json");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<T>().await?)
    }

    /// GET returning the raw response body.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        debug!(%url, "fetching page");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher").finish()
    }
}
