//! Error types for the dictionary loader.

/// Loader errors.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// Non-success status or network/local read failure during a fetch.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// Persistent storage unavailable, blocked or denied.
    #[error("cache store could not be opened: {message}")]
    StoreOpen { message: String },

    /// A store transaction failed against an open handle.
    #[error("cache store operation failed: {message}")]
    StoreOperation { message: String },

    /// No stage (bundle, cache, network) produced bytes for the URL.
    #[error("segment not found: {url}")]
    NotFound { url: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl LoaderError {
    /// Whether the failure happened against a handle and may be cured by reopening.
    pub fn is_store_operation(&self) -> bool {
        matches!(self, Self::StoreOperation { .. })
    }

    pub(crate) fn transport(url: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn store_operation(message: impl Into<String>) -> Self {
        Self::StoreOperation {
            message: message.into(),
        }
    }

    pub(crate) fn store_open(message: impl Into<String>) -> Self {
        Self::StoreOpen {
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for LoaderError {
    fn from(err: rusqlite::Error) -> Self {
        Self::StoreOperation {
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for LoaderError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::StoreOperation {
            message: format!("store task failed: {}", err),
        }
    }
}

/// Result type for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;
