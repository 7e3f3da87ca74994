// tests/offline.rs

mod common;

use common::*;
use dsa_tracker::bootstrap::{BootstrapLoader, CatalogSource, BUNDLED_CATALOG};
use dsa_tracker::models::Dataset;
use dsa_tracker::remote::OfflineRemote;
use dsa_tracker::{LocalCache, MemoryRemoteStore, ProgressStore, RemoteStore, TrackerError};
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn anonymous_progress_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.db");
    let remote = online_remote();

    {
        let mut store = store_on(LocalCache::open(&path).unwrap(), &remote);
        store.init().await.unwrap();
        store.toggle_status(5);
        store.update_notes(5, "fibonacci");
        store.toggle_study_plan_status(2);
    }

    let mut store = store_on(LocalCache::open(&path).unwrap(), &remote);
    store.init().await.unwrap();
    let p5 = store.problem(5).unwrap();
    assert!(p5.is_solved());
    assert_eq!(p5.date_solved, Some(day(2024, 3, 10)));
    assert_eq!(p5.notes, "fibonacci");
    assert_eq!(store.study_plan_progress(), (1, 3));
    assert!(remote.pushes().is_empty());
}

#[tokio::test]
async fn cached_catalog_used_when_remote_goes_down() {
    let cache = LocalCache::in_memory().unwrap();
    let remote = online_remote();
    let loader = BootstrapLoader::new(remote.clone());
    let (_, source) = loader.load_with_source(&cache).await.unwrap();
    assert_eq!(source, CatalogSource::Remote);

    remote.set_online(false);
    let (dataset, source) = loader.load_with_source(&cache).await.unwrap();
    assert_eq!(source, CatalogSource::Cache);
    assert_eq!(dataset.problems.len(), 5);
}

#[tokio::test]
async fn bundled_catalog_covers_first_offline_launch() {
    let bundled: Dataset = serde_json::from_str(BUNDLED_CATALOG).unwrap();
    let remote: Arc<dyn RemoteStore> = Arc::new(OfflineRemote);
    let mut store = ProgressStore::new(LocalCache::in_memory().unwrap(), remote);

    store.init().await.unwrap();
    assert_eq!(store.problems().len(), bundled.problems.len());
    assert!(store.problems().iter().all(|p| !p.is_solved()));
}

#[tokio::test]
async fn no_catalog_anywhere_is_data_unavailable() {
    let remote = Arc::new(MemoryRemoteStore::new());
    remote.set_online(false);
    let mut store = store_with(&remote).with_fallback("{ truncated");

    let err = store.init().await.unwrap_err();
    assert!(matches!(err, TrackerError::DataUnavailable));
    assert!(err.is_user_visible());
    assert!(!store.is_ready());
}

#[tokio::test]
async fn empty_remote_catalog_falls_through() {
    let remote = Arc::new(MemoryRemoteStore::new().with_catalog(Dataset::default()));
    let mut store = store_with(&remote).with_fallback(serde_json::to_string(&catalog()).unwrap());

    store.init().await.unwrap();
    assert_eq!(store.problems().len(), 5);
}
