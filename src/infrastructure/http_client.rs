//! HTTP client for catalog pages and product images
//!
//! This module provides the [`HttpFetch`] seam the page fetcher and image
//! downloader depend on, and its `reqwest` implementation with configured
//! headers, timeout and a bounded retry policy for transient statuses.

#![allow(clippy::uninlined_format_args)]

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::infrastructure::config::SyncConfig;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP error {status}: {url}")]
    Status { status: u16, url: String },

    #[error("Failed to read response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// Response body together with its declared content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBody {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// GET-only HTTP collaborator
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Fetch a URL and return its body as text. Non-2xx is an error.
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;

    /// Fetch a URL and return its raw body. Non-2xx is an error.
    async fn get_bytes(&self, url: &str) -> Result<FetchedBody, FetchError>;
}

/// Configuration for HTTP client behavior
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Attempts per request; only retryable statuses and transport errors are retried
    pub max_retries: u32,
    /// Headers sent with every request
    pub headers: Vec<(String, String)>,
}

impl HttpClientConfig {
    pub fn from_sync_config(config: &SyncConfig) -> Self {
        Self {
            timeout_seconds: config.request_timeout_seconds,
            max_retries: config.max_retries.max(1),
            headers: config
                .request_headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_retries: 3,
            headers: Vec::new(),
        }
    }
}

/// `reqwest`-backed [`HttpFetch`]
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn from_sync_config(config: &SyncConfig) -> Result<Self, FetchError> {
        Self::with_config(HttpClientConfig::from_sync_config(config))
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(build_header_map(&config.headers)?)
            .cookie_store(true)
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Fetch response with retry policy based on HTTP status codes and network errors
    async fn fetch_response_with_policy(&self, url: &str) -> Result<Response, FetchError> {
        let mut last_err: Option<FetchError> = None;

        for attempt in 1..=self.config.max_retries {
            debug!("🌐 HTTP GET (attempt {}/{}): {}", attempt, self.config.max_retries, url);
            match self.client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp);
                    }

                    let retryable = matches!(
                        status,
                        StatusCode::REQUEST_TIMEOUT
                            | StatusCode::TOO_MANY_REQUESTS
                            | StatusCode::BAD_GATEWAY
                            | StatusCode::SERVICE_UNAVAILABLE
                            | StatusCode::GATEWAY_TIMEOUT
                            | StatusCode::INTERNAL_SERVER_ERROR
                    );

                    error!("❌ HTTP error {} on attempt {}: {}", status, attempt, url);

                    if retryable && attempt < self.config.max_retries {
                        // Respect Retry-After if present on 429/503
                        let mut delay_secs = 2_u64.pow(attempt - 1);
                        if let Some(parsed) = resp
                            .headers()
                            .get(RETRY_AFTER)
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                        {
                            delay_secs = parsed.max(delay_secs);
                        }
                        sleep(Duration::from_secs(delay_secs)).await;
                        continue;
                    }
                    return Err(FetchError::Status {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
                Err(e) => {
                    warn!("⚠️ Network error on attempt {}: {}", attempt, e);
                    last_err = Some(FetchError::Transport {
                        url: url.to_string(),
                        message: e.to_string(),
                    });
                    if attempt < self.config.max_retries {
                        sleep(Duration::from_secs(2_u64.pow(attempt - 1))).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| FetchError::Transport {
            url: url.to_string(),
            message: "no attempt was made".to_string(),
        }))
    }
}

#[async_trait]
impl HttpFetch for HttpClient {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.fetch_response_with_policy(url).await?;
        response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_bytes(&self, url: &str) -> Result<FetchedBody, FetchError> {
        let response = self.fetch_response_with_policy(url).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let bytes = response.bytes().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        info!("📥 Downloaded {} bytes from {}", bytes.len(), url);
        Ok(FetchedBody {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

fn build_header_map(headers: &[(String, String)]) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FetchError::Client(format!("invalid header name '{}': {}", name, e)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| FetchError::Client(format!("invalid value for header '{}': {}", name, e)))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}
