//! Dictionary segment loader for tokenizer initialization.
//!
//! This crate provides:
//!
//! - Pre-bundled segment lookup (segments compiled into the binary)
//! - Binary download over HTTP(S), `file://` and plain paths
//! - A persistent SQLite cache with lazy, self-healing connection handling
//! - A loader façade resolving bundle → cache → network
//!
//! Segment content is opaque: nothing here parses dictionary data.
//!
//! # Quick Start
//!
//! ```no_run
//! use dict_loader::{DictionaryLoader, Loader, LoaderConfig};
//!
//! # async fn example() -> dict_loader::LoaderResult<()> {
//! let config = LoaderConfig::default().with_base_path("https://cdn.example.com/dict");
//! let loader = Loader::from_config(config)?;
//!
//! let base = loader.load("https://cdn.example.com/dict/base.dat").await?;
//! println!("base segment: {} bytes", base.len());
//!
//! if !loader.is_cached().await? {
//!     let segments = loader.load_all().await?;
//!     println!("loaded {} segments", segments.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `DICT_LOADER_BASE_PATH` | Base path/URL for segment files |
//! | `DICT_LOADER_NO_CACHE` | Disable the persistent cache (`1`/`true`) |
//! | `DICT_LOADER_CACHE_PATH` | SQLite cache file (default: platform cache dir) |

pub mod bundle;
pub mod error;
pub mod loader;
pub mod segments;
pub mod store;
pub mod transport;
pub mod types;

// Re-export main types
pub use bundle::{AssetResolver, BundledAssets};
pub use error::{LoaderError, LoaderResult};
pub use loader::{BundledLoader, DictionaryLoader, Loader};
pub use segments::{
    segment_name, segment_url, EXPECTED_SEGMENT_COUNT, SEGMENT_NAMES, SEGMENT_SUFFIX,
};
pub use store::{CacheStore, ConnectionManager, HandleState, SqliteCacheStore, StoreHandle};
pub use transport::{HttpTransport, Transport};
pub use types::{CacheRecord, DictionarySegments, LoadSource, LoadedSegment, LoaderConfig};
