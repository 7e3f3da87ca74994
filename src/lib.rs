// src/lib.rs

pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod events;
pub mod models;
pub mod reconcile;
pub mod remote;
pub mod scheduler;
pub mod stats;
pub mod store;

pub use config::TrackerConfig;
pub use database::LocalCache;
pub use error::{Result, TrackerError};
pub use events::{Event, EventKind};
pub use reconcile::SyncOutcome;
pub use remote::{FileRemoteStore, MemoryRemoteStore, RemoteStore};
pub use store::ProgressStore;
