// src/config.rs

use crate::constants::{CACHE_FILE_NAME, DEBOUNCE_MS, RECENT_ACTIVITY_LIMIT};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime settings. Every field has a default, so a partial JSON file (or
/// none at all) is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// SQLite file backing the local cache.
    pub cache_path: PathBuf,
    /// Root of the file-backed remote store. `None` runs fully offline.
    pub remote_dir: Option<PathBuf>,
    /// Catalog JSON used instead of the bundled one.
    pub fallback_path: Option<PathBuf>,
    pub debounce_ms: u64,
    pub recent_limit: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            cache_path: default_cache_path(),
            remote_dir: None,
            fallback_path: None,
            debounce_ms: DEBOUNCE_MS,
            recent_limit: RECENT_ACTIVITY_LIMIT,
        }
    }
}

impl TrackerConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Reads the fallback catalog override, if one is configured.
    pub fn fallback_payload(&self) -> Result<Option<String>> {
        match &self.fallback_path {
            Some(path) => Ok(Some(fs::read_to_string(path)?)),
            None => Ok(None),
        }
    }
}

fn default_cache_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("dsa-tracker").join(CACHE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CACHE_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.json");
        fs::write(&path, r#"{"debounce_ms": 500, "remote_dir": "/srv/tracker"}"#).unwrap();

        let config = TrackerConfig::from_json_file(&path).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.remote_dir, Some(PathBuf::from("/srv/tracker")));
        assert_eq!(config.recent_limit, RECENT_ACTIVITY_LIMIT);
        assert!(config.cache_path.ends_with(CACHE_FILE_NAME));
    }

    #[test]
    fn no_fallback_configured() {
        assert_eq!(TrackerConfig::default().fallback_payload().unwrap(), None);
    }
}
