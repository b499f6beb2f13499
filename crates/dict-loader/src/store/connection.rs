//! Shared, lazily opened cache connection.
//!
//! ```text
//! Unopened -> Opening -> Open -> (op failure) Stale -> Opening -> Open
//!                  \-> Failed (terminal; cleared only by `clear`)
//! ```
//!
//! `Opening` is the span during which the state mutex is held across
//! [`CacheStore::open`]; concurrent callers queue on the mutex and share
//! the handle it produces, so only one open (and one table creation) runs.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{CacheStore, StoreHandle};
use crate::error::{LoaderError, LoaderResult};

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Unopened,
    Open,
    Stale,
    Failed,
}

enum ConnectionState {
    Unopened,
    Open(Arc<dyn StoreHandle>),
    Stale,
    Failed(String),
}

/// Owns the one handle shared by every loader operation.
pub struct ConnectionManager {
    store: Arc<dyn CacheStore>,
    state: Mutex<ConnectionState>,
}

impl ConnectionManager {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            state: Mutex::new(ConnectionState::Unopened),
        }
    }

    pub async fn state(&self) -> HandleState {
        match &*self.state.lock().await {
            ConnectionState::Unopened => HandleState::Unopened,
            ConnectionState::Open(_) => HandleState::Open,
            ConnectionState::Stale => HandleState::Stale,
            ConnectionState::Failed(_) => HandleState::Failed,
        }
    }

    /// Current handle, opening the store if there is none.
    pub async fn handle(&self) -> LoaderResult<Arc<dyn StoreHandle>> {
        let mut state = self.state.lock().await;

        match &*state {
            ConnectionState::Open(handle) => return Ok(Arc::clone(handle)),
            ConnectionState::Failed(message) => return Err(LoaderError::store_open(message.clone())),
            ConnectionState::Unopened | ConnectionState::Stale => {}
        }

        debug!("opening cache store");
        match self.store.open().await {
            Ok(handle) => {
                *state = ConnectionState::Open(Arc::clone(&handle));
                Ok(handle)
            }
            Err(e) => {
                let message = match e {
                    LoaderError::StoreOpen { message } => message,
                    other => other.to_string(),
                };
                warn!(error = %message, "cache store unavailable");
                *state = ConnectionState::Failed(message.clone());
                Err(LoaderError::store_open(message))
            }
        }
    }

    /// Open ahead of the first operation; failures are kept for the next caller.
    pub async fn warm_up(&self) {
        if let Err(e) = self.handle().await {
            warn!(error = %e, "background cache store open failed");
        }
    }

    /// Run `op` against the handle; on a `StoreOperation` failure reopen and
    /// run it exactly once more.
    pub async fn with_handle<T, F, Fut>(&self, op: &'static str, f: F) -> LoaderResult<T>
    where
        F: Fn(Arc<dyn StoreHandle>) -> Fut,
        Fut: Future<Output = LoaderResult<T>>,
    {
        let handle = self.handle().await?;
        let first = match f(Arc::clone(&handle)).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_store_operation() => e,
            Err(e) => return Err(e),
        };

        warn!(op, error = %first, "cache store operation failed, reopening");
        self.invalidate(&handle).await;

        let handle = self.handle().await?;
        let result = f(Arc::clone(&handle)).await;
        if let Err(e) = &result {
            if e.is_store_operation() {
                warn!(op, error = %e, "cache store operation failed after reopen");
                self.invalidate(&handle).await;
            }
        }
        result
    }

    /// Close the live handle and delete the store.
    ///
    /// The state lock is held throughout so no open interleaves with the
    /// deletion. On success the manager starts over from `Unopened`, which
    /// also leaves `Failed`.
    pub async fn clear(&self) -> LoaderResult<()> {
        let mut state = self.state.lock().await;

        if let ConnectionState::Open(handle) = &*state {
            handle.close().await;
            *state = ConnectionState::Stale;
        }

        self.store.delete_all().await?;
        *state = ConnectionState::Unopened;
        Ok(())
    }

    /// Mark `stale` as unusable if it is still the current handle.
    async fn invalidate(&self, stale: &Arc<dyn StoreHandle>) {
        {
            let mut state = self.state.lock().await;
            if let ConnectionState::Open(current) = &*state {
                if Arc::ptr_eq(current, stale) {
                    *state = ConnectionState::Stale;
                }
            }
        }
        stale.close().await;
    }
}
