//! SQLite-backed cache store.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use super::schema::migrate;
use super::{CacheStore, StoreHandle};
use crate::error::{LoaderError, LoaderResult};
use crate::types::CacheRecord;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite journal files that may sit next to the database.
const SIDECAR_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

/// Cache store persisted in a single SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteCacheStore {
    path: PathBuf,
}

impl SqliteCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Database file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn open(&self) -> LoaderResult<Arc<dyn StoreHandle>> {
        let path = self.path.clone();
        let conn = tokio::task::spawn_blocking(move || open_connection(&path))
            .await
            .map_err(|e| LoaderError::store_open(format!("open task failed: {}", e)))??;

        debug!(path = %self.path.display(), "opened cache store");
        Ok(Arc::new(SqliteHandle::new(conn)))
    }

    async fn delete_all(&self) -> LoaderResult<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || remove_store_files(&path)).await??;

        debug!(path = %self.path.display(), "deleted cache store");
        Ok(())
    }
}

fn open_connection(path: &Path) -> LoaderResult<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            LoaderError::store_open(format!("failed to create cache directory: {}", e))
        })?;
    }

    let conn = Connection::open(path)
        .map_err(|e| LoaderError::store_open(format!("{}: {}", path.display(), e)))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| LoaderError::store_open(e.to_string()))?;
    migrate(&conn)?;
    Ok(conn)
}

/// All-or-nothing: nothing is touched unless the database file itself goes.
fn remove_store_files(path: &Path) -> LoaderResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(LoaderError::store_operation(format!(
                "failed to delete cache store: {}",
                e
            )))
        }
    }

    for suffix in SIDECAR_SUFFIXES {
        let mut sidecar = OsString::from(path.as_os_str());
        sidecar.push(suffix);
        let sidecar = PathBuf::from(sidecar);
        if let Err(e) = std::fs::remove_file(&sidecar) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %sidecar.display(), error = %e, "failed to remove cache sidecar file");
            }
        }
    }

    Ok(())
}

/// Open SQLite connection; `None` once closed.
#[derive(Clone)]
pub struct SqliteHandle {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteHandle {
    fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> LoaderResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> LoaderResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| LoaderError::store_operation("connection lock poisoned"))?;
            let conn = guard
                .as_ref()
                .ok_or_else(|| LoaderError::store_operation("connection closed"))?;
            f(conn)
        })
        .await?
    }
}

#[async_trait]
impl StoreHandle for SqliteHandle {
    async fn count(&self) -> LoaderResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM dict_data", [], |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }

    async fn get(&self, url: &str) -> LoaderResult<Option<CacheRecord>> {
        let url = url.to_string();
        self.with_conn(move |conn| {
            let data: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT data FROM dict_data WHERE url = ?1",
                    params![url],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(data.map(|data| CacheRecord::new(url, Bytes::from(data))))
        })
        .await
    }

    async fn put(&self, record: CacheRecord) -> LoaderResult<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO dict_data (url, data) VALUES (?1, ?2)
                 ON CONFLICT(url) DO NOTHING",
                params![record.url, &record.data[..]],
            )?;
            Ok(())
        })
        .await
    }

    async fn close(&self) {
        let conn = Arc::clone(&self.conn);
        let closed = tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(|poisoned| {
                warn!("cache store connection lock poisoned, closing anyway");
                poisoned.into_inner()
            });
            guard.take();
        })
        .await;

        if let Err(e) = closed {
            warn!(error = %e, "failed to close cache store connection");
        }
    }
}
