// HTTP fetch collaborator. Every GET goes out with a browser user agent and
// follows redirects; the final URL is kept so short links can be resolved.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use albumsync_common::{AlbumSyncError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// URL after redirects.
    pub url: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// GET a URL. Non-2xx statuses are returned as responses, not errors;
    /// only transport failures are `Err`.
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| AlbumSyncError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let resp = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml")
            .header("Accept-Language", "en-GB,en;q=0.9")
            .send()
            .await
            .map_err(|e| AlbumSyncError::Network(format!("{url}: {e}")))?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let body = resp
            .text()
            .await
            .map_err(|e| AlbumSyncError::Network(format!("{url}: {e}")))?;

        debug!(url, final_url = final_url.as_str(), status, bytes = body.len(), "http: fetched");

        Ok(HttpResponse {
            status,
            url: final_url,
            body,
        })
    }
}
