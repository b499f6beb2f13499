//! Configuration and value types shared across the loader.

use std::collections::BTreeMap;
use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, LoaderResult};

/// File name of the SQLite cache inside the cache directory.
pub const CACHE_FILE_NAME: &str = "dict-data.sqlite3";

/// Loader configuration. Immutable once handed to a loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Base path or URL that segment files live under.
    #[serde(default)]
    pub base_path: Option<String>,

    /// Whether downloaded segments are persisted in the cache store.
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    /// Explicit location of the cache database.
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

fn default_cache_enabled() -> bool {
    true
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_path: None,
            cache_enabled: default_cache_enabled(),
            cache_path: None,
        }
    }
}

impl LoaderConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `DICT_LOADER_BASE_PATH` | Base path/URL for segment files |
    /// | `DICT_LOADER_NO_CACHE` | Disable the persistent cache |
    /// | `DICT_LOADER_CACHE_PATH` | SQLite cache file |
    pub fn from_env() -> Self {
        Self {
            base_path: std::env::var("DICT_LOADER_BASE_PATH")
                .ok()
                .filter(|v| !v.is_empty()),
            cache_enabled: !std::env::var("DICT_LOADER_NO_CACHE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            cache_path: std::env::var("DICT_LOADER_CACHE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Set the base path.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Enable or disable the persistent cache.
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Disable the persistent cache.
    pub fn without_cache(self) -> Self {
        self.with_cache_enabled(false)
    }

    /// Set the cache database location.
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    /// Resolve the cache database file.
    ///
    /// Default: `<platform cache dir>/dict-loader/dict-data.sqlite3`
    pub fn cache_location(&self) -> LoaderResult<PathBuf> {
        if let Some(path) = &self.cache_path {
            return Ok(path.clone());
        }

        let base = dirs::cache_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| LoaderError::Config {
                message: "could not determine cache directory".to_string(),
            })?;

        Ok(base.join("dict-loader").join(CACHE_FILE_NAME))
    }
}

/// One cached segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    /// Primary key.
    pub url: String,

    /// Raw segment bytes.
    pub data: Bytes,
}

impl CacheRecord {
    pub fn new(url: impl Into<String>, data: Bytes) -> Self {
        Self {
            url: url.into(),
            data,
        }
    }
}

/// Where a loaded segment came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// Pre-bundled asset, by segment name.
    Bundled(String),

    /// Persistent cache store.
    Cache,

    /// Fetched through the transport.
    Network(String),
}

impl std::fmt::Display for LoadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bundled(name) => write!(f, "bundled:{}", name),
            Self::Cache => write!(f, "cache"),
            Self::Network(url) => write!(f, "network:{}", url),
        }
    }
}

/// Segment bytes together with their origin.
#[derive(Debug, Clone)]
pub struct LoadedSegment {
    pub data: Bytes,
    pub source: LoadSource,
}

/// Every dictionary segment, keyed by segment name.
#[derive(Debug, Clone, Default)]
pub struct DictionarySegments {
    segments: BTreeMap<String, Bytes>,
}

impl DictionarySegments {
    pub(crate) fn insert(&mut self, name: impl Into<String>, data: Bytes) {
        self.segments.insert(name.into(), data);
    }

    /// Bytes of a segment by name (`"base"`, `"tid_map"`, ...).
    pub fn get(&self, name: &str) -> Option<&Bytes> {
        self.segments.get(name)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.segments.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_inner(self) -> BTreeMap<String, Bytes> {
        self.segments
    }
}
