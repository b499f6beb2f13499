//! Pre-bundled segment lookup.
//!
//! Segments embedded at build time (`include_bytes!`) or shipped next to
//! the binary bypass both the cache and the network.

use std::collections::HashMap;
use std::path::Path;

use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use crate::error::{LoaderError, LoaderResult};
use crate::segments::{segment_name, SEGMENT_SUFFIX};

/// Maps a URL to pre-bundled bytes, if any.
pub trait AssetResolver: Send + Sync {
    /// `None` defers to the next resolution stage.
    fn resolve(&self, url: &str) -> Option<Bytes>;
}

/// Fixed segment-name → bytes map.
#[derive(Debug, Clone, Default)]
pub struct BundledAssets {
    assets: HashMap<String, Bytes>,
}

impl BundledAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a segment.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Bytes>) {
        self.assets.insert(name.into(), data.into());
    }

    /// Add a segment embedded in the binary.
    pub fn with_static(mut self, name: impl Into<String>, data: &'static [u8]) -> Self {
        self.assets.insert(name.into(), Bytes::from_static(data));
        self
    }

    /// Load every `*.dat` file in `dir`, keyed by file stem.
    pub async fn from_dir(dir: impl AsRef<Path>) -> LoaderResult<Self> {
        let dir = dir.as_ref();
        let mut bundle = Self::new();

        let mut entries = fs::read_dir(dir).await.map_err(|e| LoaderError::Config {
            message: format!("failed to read bundle directory {}: {}", dir.display(), e),
        })?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| LoaderError::Config {
            message: format!("failed to read directory entry: {}", e),
        })? {
            let file_name = entry.file_name().to_string_lossy().to_string();
            let Some(name) = file_name.strip_suffix(SEGMENT_SUFFIX) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }

            let data = fs::read(entry.path())
                .await
                .map_err(|e| LoaderError::Config {
                    message: format!("failed to read bundled segment {}: {}", file_name, e),
                })?;
            debug!(name, size = data.len(), "bundled segment");
            bundle.insert(name, data);
        }

        Ok(bundle)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.assets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetResolver for BundledAssets {
    fn resolve(&self, url: &str) -> Option<Bytes> {
        let name = segment_name(url)?;
        self.assets.get(name).cloned()
    }
}
