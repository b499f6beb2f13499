//! Loader façade.
//!
//! Resolves a segment URL with the following priority:
//! 1. Bundled asset (compiled into the binary)
//! 2. Cache (if enabled)
//! 3. Transport (network or local file), written through to the cache

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use crate::bundle::{AssetResolver, BundledAssets};
use crate::error::{LoaderError, LoaderResult};
use crate::segments::{segment_name, segment_url, EXPECTED_SEGMENT_COUNT, SEGMENT_NAMES};
use crate::store::{CacheStore, ConnectionManager, HandleState, SqliteCacheStore};
use crate::transport::{HttpTransport, Transport};
use crate::types::{CacheRecord, DictionarySegments, LoadSource, LoadedSegment, LoaderConfig};

/// What a tokenizer needs from a dictionary source.
#[async_trait]
pub trait DictionaryLoader: Send + Sync {
    /// Raw bytes of the segment at `url`.
    async fn load(&self, url: &str) -> LoaderResult<Bytes>;

    /// Whether every expected segment is in the persistent cache.
    async fn is_cached(&self) -> LoaderResult<bool>;

    /// Drop every cached segment so the next load fetches again.
    async fn clear_cache(&self) -> LoaderResult<()>;

    /// Base path segment URLs are built from.
    fn base_path(&self) -> Option<&str>;

    /// Load every segment in [`SEGMENT_NAMES`] under [`Self::base_path`].
    ///
    /// Loads run concurrently on the calling task; the first failure wins.
    async fn load_all(&self) -> LoaderResult<DictionarySegments> {
        let base = self.base_path();
        let loads = SEGMENT_NAMES.iter().map(|name| async move {
            let url = segment_url(base, name);
            self.load(&url).await.map(|data| (*name, data))
        });

        let mut segments = DictionarySegments::default();
        for (name, data) in futures::future::try_join_all(loads).await? {
            segments.insert(name, data);
        }
        Ok(segments)
    }
}

/// Bundle → cache → transport loader.
pub struct Loader {
    config: LoaderConfig,
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn AssetResolver>,
    /// Absent when caching is disabled and no cache path was configured.
    store: Option<Arc<dyn CacheStore>>,
    /// Present iff caching is enabled.
    connection: Option<Arc<ConnectionManager>>,
}

impl Loader {
    /// Create a loader with the SQLite cache at `config.cache_location()`.
    ///
    /// With caching disabled the location is only resolved when
    /// `cache_path` is set explicitly.
    pub fn new(
        config: LoaderConfig,
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn AssetResolver>,
    ) -> LoaderResult<Self> {
        let store = sqlite_store_for(&config)?;
        Ok(Self::build(config, transport, resolver, store))
    }

    /// Create a loader with custom components.
    ///
    /// With caching enabled and a tokio runtime available, the store starts
    /// opening in the background; an open failure is reported by the next
    /// operation.
    pub fn with_store(
        config: LoaderConfig,
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn AssetResolver>,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        Self::build(config, transport, resolver, Some(store))
    }

    fn build(
        config: LoaderConfig,
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn AssetResolver>,
        store: Option<Arc<dyn CacheStore>>,
    ) -> Self {
        let connection = store
            .as_ref()
            .filter(|_| config.cache_enabled)
            .map(|store| Arc::new(ConnectionManager::new(Arc::clone(store))));

        if let Some(manager) = &connection {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                let manager = Arc::clone(manager);
                runtime.spawn(async move { manager.warm_up().await });
            }
        }

        Self {
            config,
            transport,
            resolver,
            store,
            connection,
        }
    }

    /// HTTP transport, no bundled assets.
    pub fn from_config(config: LoaderConfig) -> LoaderResult<Self> {
        let transport = Arc::new(HttpTransport::new()?);
        Self::new(config, transport, Arc::new(BundledAssets::default()))
    }

    pub fn from_env() -> LoaderResult<Self> {
        Self::from_config(LoaderConfig::from_env())
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Connection state; `None` when caching is disabled.
    pub async fn cache_state(&self) -> Option<HandleState> {
        match &self.connection {
            Some(manager) => Some(manager.state().await),
            None => None,
        }
    }

    /// Load a segment and report which stage produced it.
    pub async fn load_with_source(&self, url: &str) -> LoaderResult<LoadedSegment> {
        if let Some(data) = self.resolver.resolve(url) {
            let name = segment_name(url).unwrap_or(url).to_string();
            debug!(url, name = %name, "bundled segment");
            return Ok(LoadedSegment {
                data,
                source: LoadSource::Bundled(name),
            });
        }

        if let Some(manager) = &self.connection {
            let cached = manager
                .with_handle("get", |handle| {
                    let url = url.to_string();
                    async move { handle.get(&url).await }
                })
                .await?;

            if let Some(record) = cached {
                debug!(url, size = record.data.len(), "cache hit");
                return Ok(LoadedSegment {
                    data: record.data,
                    source: LoadSource::Cache,
                });
            }
            debug!(url, "cache miss");
        }

        // Any successful body is the segment, including a zero-length one.
        let data = self.transport.fetch_binary(url).await?;

        if let Some(manager) = &self.connection {
            let record = CacheRecord::new(url, data.clone());
            manager
                .with_handle("put", |handle| {
                    let record = record.clone();
                    async move { handle.put(record).await }
                })
                .await?;
            debug!(url, "cached segment");
        }

        info!(url, size = data.len(), "fetched segment");
        Ok(LoadedSegment {
            data,
            source: LoadSource::Network(url.to_string()),
        })
    }
}

#[async_trait]
impl DictionaryLoader for Loader {
    async fn load(&self, url: &str) -> LoaderResult<Bytes> {
        self.load_with_source(url).await.map(|segment| segment.data)
    }

    async fn is_cached(&self) -> LoaderResult<bool> {
        let Some(manager) = &self.connection else {
            return Ok(false);
        };

        let count = manager
            .with_handle("count", |handle| async move { handle.count().await })
            .await?;
        debug!(count, expected = EXPECTED_SEGMENT_COUNT, "cache record count");
        Ok(count == EXPECTED_SEGMENT_COUNT)
    }

    async fn clear_cache(&self) -> LoaderResult<()> {
        match (&self.connection, &self.store) {
            (Some(manager), _) => manager.clear().await?,
            (None, Some(store)) => store.delete_all().await?,
            (None, None) => {
                debug!("no cache store configured, nothing to clear");
                return Ok(());
            }
        }
        info!("cleared dictionary cache");
        Ok(())
    }

    fn base_path(&self) -> Option<&str> {
        self.config.base_path.as_deref()
    }
}

/// SQLite store for `config`; `None` when caching is off and no path is set.
fn sqlite_store_for(config: &LoaderConfig) -> LoaderResult<Option<Arc<dyn CacheStore>>> {
    if !config.cache_enabled && config.cache_path.is_none() {
        return Ok(None);
    }
    let store: Arc<dyn CacheStore> = Arc::new(SqliteCacheStore::new(config.cache_location()?));
    Ok(Some(store))
}

/// Loader backed only by bundled assets.
pub struct BundledLoader {
    resolver: Arc<dyn AssetResolver>,
    base_path: Option<String>,
}

impl BundledLoader {
    pub fn new(resolver: Arc<dyn AssetResolver>) -> Self {
        Self {
            resolver,
            base_path: None,
        }
    }

    /// Set the base path used by `load_all`.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }
}

#[async_trait]
impl DictionaryLoader for BundledLoader {
    async fn load(&self, url: &str) -> LoaderResult<Bytes> {
        self.resolver.resolve(url).ok_or_else(|| LoaderError::NotFound {
            url: url.to_string(),
        })
    }

    async fn is_cached(&self) -> LoaderResult<bool> {
        Ok(false)
    }

    async fn clear_cache(&self) -> LoaderResult<()> {
        Ok(())
    }

    fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreHandle;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory transport that counts fetches per URL.
    #[derive(Default)]
    struct MockTransport {
        bodies: HashMap<String, Bytes>,
        calls: Mutex<HashMap<String, usize>>,
        total: AtomicUsize,
    }

    impl MockTransport {
        fn with(mut self, url: &str, body: &'static [u8]) -> Self {
            self.bodies.insert(url.to_string(), Bytes::from_static(body));
            self
        }

        fn calls(&self, url: &str) -> usize {
            self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn fetch_binary(&self, url: &str) -> LoaderResult<Bytes> {
            self.total.fetch_add(1, Ordering::SeqCst);
            *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| LoaderError::transport(url, "404 Not Found"))
        }
    }

    fn create_loader(
        config: LoaderConfig,
        transport: Arc<MockTransport>,
        bundle: BundledAssets,
    ) -> (Loader, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = config.with_cache_path(temp_dir.path().join("dict.sqlite3"));
        let loader = Loader::new(config, transport, Arc::new(bundle)).unwrap();
        (loader, temp_dir)
    }

    #[tokio::test]
    async fn test_bundle_bypasses_cache_and_transport() {
        let transport = Arc::new(MockTransport::default().with("h/base.dat", b"net"));
        let bundle = BundledAssets::new().with_static("base", b"bundled");
        let (loader, _temp_dir) =
            create_loader(LoaderConfig::default(), Arc::clone(&transport), bundle);

        let segment = loader.load_with_source("h/base.dat").await.unwrap();

        assert_eq!(segment.data.as_ref(), b"bundled");
        assert_eq!(segment.source, LoadSource::Bundled("base".into()));
        assert_eq!(transport.total.load(Ordering::SeqCst), 0);
        assert!(!loader.is_cached().await.unwrap());
    }

    #[tokio::test]
    async fn test_network_then_cache() {
        let transport = Arc::new(MockTransport::default().with("h/cc.dat", b"\x01\x02cc"));
        let (loader, _temp_dir) = create_loader(
            LoaderConfig::default(),
            Arc::clone(&transport),
            BundledAssets::default(),
        );

        let first = loader.load_with_source("h/cc.dat").await.unwrap();
        let second = loader.load_with_source("h/cc.dat").await.unwrap();

        assert_eq!(first.source, LoadSource::Network("h/cc.dat".into()));
        assert_eq!(second.source, LoadSource::Cache);
        assert_eq!(first.data, second.data);
        assert_eq!(transport.calls("h/cc.dat"), 1);
    }

    #[tokio::test]
    async fn test_cache_disabled_always_fetches() {
        let transport = Arc::new(MockTransport::default().with("h/base.dat", b"base"));
        let (loader, temp_dir) = create_loader(
            LoaderConfig::default().without_cache(),
            Arc::clone(&transport),
            BundledAssets::default(),
        );

        assert_eq!(loader.load("h/base.dat").await.unwrap().as_ref(), b"base");
        assert_eq!(loader.load("h/base.dat").await.unwrap().as_ref(), b"base");

        assert_eq!(transport.calls("h/base.dat"), 2);
        assert!(!loader.is_cached().await.unwrap());
        assert!(loader.cache_state().await.is_none());
        assert!(!temp_dir.path().join("dict.sqlite3").exists());
    }

    #[tokio::test]
    async fn test_cache_disabled_without_path_skips_store() {
        let config = LoaderConfig::default().without_cache();
        assert!(sqlite_store_for(&config).unwrap().is_none());
        let explicit = LoaderConfig::default().without_cache().with_cache_path("c.sqlite3");
        assert!(sqlite_store_for(&explicit).unwrap().is_some());

        let transport = Arc::new(MockTransport::default().with("h/base.dat", b"base"));
        let loader = Loader::new(
            config,
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::new(BundledAssets::default()),
        )
        .unwrap();

        assert_eq!(loader.load("h/base.dat").await.unwrap().as_ref(), b"base");
        assert!(!loader.is_cached().await.unwrap());
        loader.clear_cache().await.unwrap();
    }

    #[tokio::test]
    async fn test_cache_disabled_clear_deletes_configured_store() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dict.sqlite3");
        let handle = SqliteCacheStore::new(&path).open().await.unwrap();
        handle.close().await;
        assert!(path.exists());

        let loader = Loader::new(
            LoaderConfig::default().without_cache().with_cache_path(&path),
            Arc::new(MockTransport::default()),
            Arc::new(BundledAssets::default()),
        )
        .unwrap();
        loader.clear_cache().await.unwrap();

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let transport = Arc::new(MockTransport::default());
        let (loader, _temp_dir) = create_loader(
            LoaderConfig::default(),
            Arc::clone(&transport),
            BundledAssets::default(),
        );

        let result = loader.load("h/missing.dat").await;
        assert!(matches!(result, Err(LoaderError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_empty_body_is_written_through() {
        let transport = Arc::new(MockTransport::default().with("h/unk_compat.dat", b""));
        let bundle = BundledAssets::new().with_static("unk_invoke", b"");
        let (loader, _temp_dir) =
            create_loader(LoaderConfig::default(), Arc::clone(&transport), bundle);

        let first = loader.load_with_source("h/unk_compat.dat").await.unwrap();
        let second = loader.load_with_source("h/unk_compat.dat").await.unwrap();

        assert!(first.data.is_empty());
        assert_eq!(first.source, LoadSource::Network("h/unk_compat.dat".into()));
        assert!(second.data.is_empty());
        assert_eq!(second.source, LoadSource::Cache);
        assert_eq!(transport.calls("h/unk_compat.dat"), 1);

        // Same answer as an empty bundled segment.
        assert!(loader.load("h/unk_invoke.dat").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_all_uses_base_path() {
        let mut transport = MockTransport::default();
        for name in SEGMENT_NAMES {
            let url = segment_url(Some("h/dict"), name);
            transport
                .bodies
                .insert(url, Bytes::from(name.as_bytes().to_vec()));
        }
        let transport = Arc::new(transport);
        let (loader, _temp_dir) = create_loader(
            LoaderConfig::default().with_base_path("h/dict/"),
            Arc::clone(&transport),
            BundledAssets::default(),
        );

        let segments = loader.load_all().await.unwrap();

        assert_eq!(segments.len(), SEGMENT_NAMES.len());
        assert_eq!(segments.get("tid_pos").unwrap().as_ref(), b"tid_pos");
        assert!(loader.is_cached().await.unwrap());
    }

    #[tokio::test]
    async fn test_bundled_loader() {
        let bundle = BundledAssets::new().with_static("unk", b"unk");
        let loader = BundledLoader::new(Arc::new(bundle)).with_base_path("dict");

        assert_eq!(loader.load("dict/unk.dat").await.unwrap().as_ref(), b"unk");
        assert!(matches!(
            loader.load("dict/base.dat").await,
            Err(LoaderError::NotFound { .. })
        ));
        assert!(!loader.is_cached().await.unwrap());
        loader.clear_cache().await.unwrap();
        assert!(matches!(
            loader.load_all().await,
            Err(LoaderError::NotFound { .. })
        ));
    }
}
