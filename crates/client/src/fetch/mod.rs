//! HTTP network primitive for the cache controller.
//!
//! ### Responses
//! - Bodies are read to completion (bounded by `max_bytes`) so a single
//!   response can be returned to the caller and written to the cache.
//! - HTTP error statuses are ordinary responses; only transport failures
//!   (DNS, connect, timeout, body read) are errors.
//!
//! ### Response type
//! - `basic` when the final URL (after redirects) shares the configured origin
//! - `cors` otherwise

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};
use url::Url;

use shellcache_core::{AppConfig, Error, Fetcher, InterceptedRequest, Response, ResponseType};

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Origin the controller serves; decides `basic` vs `cors` responses.
    pub origin: Url,

    /// User agent string (default: "shellcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl FetchConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            user_agent: "shellcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }

    /// Build from application config.
    pub fn from_app_config(config: &AppConfig, origin: Url) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Self::new(origin)
        }
    }
}

/// Classify a response by comparing its final URL with the controller origin.
pub fn classify(origin: &Url, final_url: &Url) -> ResponseType {
    if origin.origin() == final_url.origin() { ResponseType::Basic } else { ResponseType::Cors }
}

/// reqwest-backed [`Fetcher`].
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn transport_error(url: &Url, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::FetchTimeout(format!("{url}: {err}"))
        } else {
            Error::Network(format!("{url}: {err}"))
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {}", request.method)))?;

        let response = self
            .http
            .request(method, request.url.clone())
            .send()
            .await
            .map_err(|e| Self::transport_error(&request.url, e))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes: Bytes = response
            .bytes()
            .await
            .map_err(|e| Self::transport_error(&request.url, e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes, {:?})",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len(),
            content_type
        );

        Ok(Response {
            response_type: classify(&self.config.origin, &final_url),
            url: final_url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body: bytes,
        })
    }
}
