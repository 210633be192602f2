// src/fetch.rs

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::context::ScrapeContext;
use crate::error::{FetchError, Result};

/// Anything that can turn a page URL into markup.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError>;
}

/// Fetches pages over one reqwest session built from the run context.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(ctx: &ScrapeContext) -> Result<Self> {
        let client = Client::builder()
            .default_headers(ctx.headers().clone())
            .timeout(ctx.timeout())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;
        debug!(url, status = %status, bytes = body.len(), "fetched page");
        Ok(body)
    }
}
