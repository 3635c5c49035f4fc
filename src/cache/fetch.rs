//! Remote fetchers used to fill the cache.
//!
//! `HttpFetcher` is a single-shot GET. Retries and backoff are left to
//! whoever wraps it.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} for {reference}")]
    Status { reference: String, status: u16 },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

/// Trait for anything that can retrieve a remote reference
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieve the full body of `reference`
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP fetcher backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    /// Create a fetcher with a default client
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a fetcher with a per-request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Use an existing client (shared connection pool, custom headers, ...)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(reference).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(reference.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                reference: reference.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_http_error() {
        let fetcher = HttpFetcher::new();
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
    }

    #[test]
    fn test_with_timeout_builds() {
        assert!(HttpFetcher::with_timeout(Duration::from_secs(5)).is_ok());
    }
}
