//! Fetch layer: target classification and status mapping.
//!
//! This is the ONLY place for status code handling. transport/mod.rs never
//! interprets status codes.

use std::path::PathBuf;

use bytes::Bytes;
use reqwest::StatusCode;
use tokio::fs;
use tracing::debug;
use url::Url;

use crate::error::{LoaderError, LoaderResult};

/// What a URL points at.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FetchTarget {
    /// http(s); answered with a real status code.
    Remote(Url),
    /// file:// URL or bare path; no status code, success unless the read fails.
    Local(PathBuf),
}

pub(crate) fn classify(url: &str) -> LoaderResult<FetchTarget> {
    match Url::parse(url) {
        Ok(parsed) => match parsed.scheme() {
            "http" | "https" => Ok(FetchTarget::Remote(parsed)),
            "file" => parsed
                .to_file_path()
                .map(FetchTarget::Local)
                .map_err(|_| LoaderError::transport(url, "invalid file URL")),
            // Windows drive letter, e.g. `C:\dict\base.dat`
            scheme if scheme.len() == 1 => Ok(FetchTarget::Local(PathBuf::from(url))),
            scheme => Err(LoaderError::transport(
                url,
                format!("unsupported scheme: {}", scheme),
            )),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(FetchTarget::Local(PathBuf::from(url))),
        Err(e) => Err(LoaderError::transport(url, format!("invalid URL: {}", e))),
    }
}

/// Exactly 200 counts as success.
pub(crate) fn check_status(url: &str, status: StatusCode) -> LoaderResult<()> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        Err(LoaderError::transport(url, status.to_string()))
    }
}

/// HTTP backend (holds the reqwest client).
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
}

impl HttpBackend {
    pub(crate) async fn fetch(&self, url: &str) -> LoaderResult<Bytes> {
        match classify(url)? {
            FetchTarget::Remote(target) => self.fetch_remote(url, target).await,
            FetchTarget::Local(path) => fetch_local(url, path).await,
        }
    }

    async fn fetch_remote(&self, url: &str, target: Url) -> LoaderResult<Bytes> {
        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| LoaderError::transport(url, e.to_string()))?;

        check_status(url, response.status())?;

        let body = response
            .bytes()
            .await
            .map_err(|e| LoaderError::transport(url, format!("failed to read response body: {}", e)))?;

        debug!(url, size = body.len(), "fetched segment");
        Ok(body)
    }
}

async fn fetch_local(url: &str, path: PathBuf) -> LoaderResult<Bytes> {
    let data = fs::read(&path)
        .await
        .map_err(|e| LoaderError::transport(url, format!("failed to read local file: {}", e)))?;

    debug!(path = %path.display(), size = data.len(), "read local segment");
    Ok(Bytes::from(data))
}
