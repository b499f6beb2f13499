//! Binary fetch transport.
//!
//! Public API: no status code knowledge. All status mapping in http.rs.
//! No built-in timeout or retry; wrap calls with `tokio::time::timeout`
//! when bounded latency is needed.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::{LoaderError, LoaderResult};

mod http;

use http::HttpBackend;

const USER_AGENT_VALUE: &str = concat!("dict-loader/", env!("CARGO_PKG_VERSION"));

/// Fetches the raw bytes behind a URL.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch_binary(&self, url: &str) -> LoaderResult<Bytes>;
}

/// reqwest-backed transport for http(s), file:// and plain paths.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpBackend,
}

impl HttpTransport {
    pub fn new() -> LoaderResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .build()
            .map_err(|e| LoaderError::Config {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self::with_client(client))
    }

    /// Use a preconfigured client (proxies, custom TLS roots, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            http: HttpBackend { client },
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_binary(&self, url: &str) -> LoaderResult<Bytes> {
        self.http.fetch(url).await
    }
}
