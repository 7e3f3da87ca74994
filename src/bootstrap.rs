// src/bootstrap.rs

use crate::constants::CACHE_DATASET_KEY;
use crate::database::LocalCache;
use crate::error::{Result, TrackerError};
use crate::models::Dataset;
use crate::remote::RemoteStore;
use log::{debug, info, warn};
use std::sync::Arc;

/// Catalog shipped inside the binary, used before anything was ever uploaded.
pub const BUNDLED_CATALOG: &str = include_str!("data/fallback_catalog.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    Remote,
    Cache,
    Bundled,
}

/// Produces the base dataset through an ordered fallback chain:
/// remote catalog, then the cached snapshot, then the bundled payload.
pub struct BootstrapLoader {
    remote: Arc<dyn RemoteStore>,
    fallback: String,
}

impl BootstrapLoader {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        BootstrapLoader {
            remote,
            fallback: BUNDLED_CATALOG.to_string(),
        }
    }

    /// Replaces the bundled payload, e.g. with a `data.json` on disk.
    pub fn with_fallback(mut self, payload: impl Into<String>) -> Self {
        self.fallback = payload.into();
        self
    }

    pub async fn load(&self, cache: &LocalCache) -> Result<Dataset> {
        self.load_with_source(cache).await.map(|(dataset, _)| dataset)
    }

    pub async fn load_with_source(&self, cache: &LocalCache) -> Result<(Dataset, CatalogSource)> {
        // 1. Remote (authoritative, written through to the cache)
        match self.remote.fetch_base_catalog().await {
            Ok(Some(dataset)) if !dataset.problems.is_empty() => {
                cache.set(CACHE_DATASET_KEY, &dataset);
                info!(
                    "[BOOT] Catalog from remote: {} problems",
                    dataset.problems.len()
                );
                return Ok((dataset, CatalogSource::Remote));
            }
            Ok(_) => debug!("[BOOT] Remote has no catalog"),
            Err(e) => warn!("[BOOT] Remote catalog unavailable, trying cache: {}", e),
        }

        // 2. Last-known-good snapshot
        if let Some(dataset) = cache
            .get::<Dataset>(CACHE_DATASET_KEY)
            .filter(|d| !d.problems.is_empty())
        {
            info!(
                "[BOOT] Catalog from local cache: {} problems",
                dataset.problems.len()
            );
            return Ok((dataset, CatalogSource::Cache));
        }

        // 3. Bundled payload for first-time setup
        match serde_json::from_str::<Dataset>(&self.fallback) {
            Ok(dataset) if !dataset.problems.is_empty() => {
                info!(
                    "[BOOT] Catalog from bundled fallback: {} problems",
                    dataset.problems.len()
                );
                Ok((dataset, CatalogSource::Bundled))
            }
            Ok(_) => {
                warn!("[BOOT] Bundled fallback is empty");
                Err(TrackerError::DataUnavailable)
            }
            Err(e) => {
                warn!("[BOOT] Bundled fallback unreadable: {}", e);
                Err(TrackerError::DataUnavailable)
            }
        }
    }
}
