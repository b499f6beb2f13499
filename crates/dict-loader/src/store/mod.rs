//! Persistent segment cache.
//!
//! # Store Structure
//!
//! ```text
//! <cache dir>/dict-loader/dict-data.sqlite3
//!   dict_data(url TEXT PRIMARY KEY, data BLOB)
//! ```
//!
//! A [`CacheStore`] opens [`StoreHandle`]s. Handles can go stale at any
//! time; [`ConnectionManager`] owns the single shared handle and reopens
//! it once when an operation fails against it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LoaderResult;
use crate::types::CacheRecord;

mod connection;
pub mod schema;
mod sqlite;

pub use connection::{ConnectionManager, HandleState};
pub use sqlite::{SqliteCacheStore, SqliteHandle};

/// A persistent key-value table of segment records.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Open a connection, creating the table on first use.
    async fn open(&self) -> LoaderResult<Arc<dyn StoreHandle>>;

    /// Delete the whole store. Callers close their handles first.
    async fn delete_all(&self) -> LoaderResult<()>;
}

/// An open connection to a [`CacheStore`].
#[async_trait]
pub trait StoreHandle: Send + Sync {
    /// Number of records.
    async fn count(&self) -> LoaderResult<u64>;

    async fn get(&self, url: &str) -> LoaderResult<Option<CacheRecord>>;

    /// Insert a record; an existing record with the same URL is kept.
    async fn put(&self, record: CacheRecord) -> LoaderResult<()>;

    /// Release the connection. Later operations fail with `StoreOperation`.
    async fn close(&self);
}
