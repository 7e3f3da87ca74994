// src/error.rs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Remote catalog, cached snapshot and bundled fallback all failed.
    #[error("no catalog data available from remote, cache or bundled fallback")]
    DataUnavailable,

    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("invalid backup file: {0}")]
    InvalidImport(String),

    #[error("local cache entry corrupt: {0}")]
    LocalCacheCorrupt(String),

    #[error("local cache error: {0}")]
    Cache(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrackerError {
    /// Errors the caller must see. Everything else degrades silently.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            TrackerError::DataUnavailable | TrackerError::InvalidImport(_)
        )
    }
}
