//! Image fetching over HTTP
//!
//! [`validate_url`] rejects malformed URLs before any network I/O. [`HttpFetcher`]
//! performs a single GET per item with a fixed timeout, a redirect cap and an
//! explicit `User-Agent`; there are no retries.

use crate::config::PipelineConfig;
use crate::error::{Error, FetchError, ItemError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use url::Url;

/// Source of raw image bytes
///
/// The pipeline depends on this trait rather than on reqwest directly so the
/// transport can be replaced (tests, alternative clients).
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the full body behind `url`
    async fn fetch(&self, url: &Url) -> std::result::Result<Bytes, FetchError>;
}

/// Parse and check a source URL
///
/// Only absolute `http`/`https` URLs with a host are accepted.
pub fn validate_url(raw: &str) -> std::result::Result<Url, ItemError> {
    let invalid = |reason: String| ItemError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }

    Ok(url)
}

/// reqwest-backed [`ImageFetcher`]
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_redirects: usize,
}

impl HttpFetcher {
    /// Build a client from the pipeline settings
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout: config.fetch_timeout,
            max_redirects: config.max_redirects,
        })
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else if e.is_redirect() {
            FetchError::TooManyRedirects {
                limit: self.max_redirects,
            }
        } else if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            FetchError::Body(e.to_string())
        } else {
            FetchError::Client(e.to_string())
        }
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> std::result::Result<Bytes, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        // A 200 with nothing in it is not usable image data
        if body.is_empty() {
            return Err(FetchError::EmptyBody);
        }

        tracing::debug!(url = %url, bytes = body.len(), "fetched image");

        Ok(body)
    }
}
