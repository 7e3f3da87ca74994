// src/database.rs

use crate::error::{Result, TrackerError};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    debug!("init_db: Checking cache schema...");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS kv_cache (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s','now'))
        );
        ",
    )
}

/// Device-local key/value cache. Every value is stored as JSON text.
///
/// Reads never fail: a missing row, a SQLite error or an unparsable value
/// all come back as `None`. Writes are best-effort and only logged on
/// failure, the cache is disposable.
pub struct LocalCache {
    conn: Connection,
}

impl LocalCache {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        init_db(&conn)?;
        Ok(LocalCache { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_db(&conn)?;
        Ok(LocalCache { conn })
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                let err = TrackerError::LocalCacheCorrupt(format!("'{}': {}", key, e));
                warn!("[CACHE] {}, treating as absent", err);
                None
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("[CACHE] Could not encode '{}': {}", key, e);
                return;
            }
        };
        self.set_raw(key, &raw);
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = self.conn.execute("DELETE FROM kv_cache WHERE key = ?", [key]) {
            warn!("[CACHE] Delete of '{}' failed: {}", key, e);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get_raw(key).is_some()
    }

    pub(crate) fn get_raw(&self, key: &str) -> Option<String> {
        self.conn
            .query_row(
                "SELECT value FROM kv_cache WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()
            .unwrap_or_else(|e| {
                warn!("[CACHE] Read of '{}' failed: {}", key, e);
                None
            })
    }

    pub(crate) fn set_raw(&self, key: &str, raw: &str) {
        let result = self.conn.execute(
            "INSERT OR REPLACE INTO kv_cache (key, value, updated_at) VALUES (?, ?, strftime('%s','now'))",
            params![key, raw],
        );
        match result {
            Ok(_) => debug!("[CACHE] Wrote '{}' ({} bytes)", key, raw.len()),
            Err(e) => warn!("[CACHE] Write of '{}' dropped: {}", key, e),
        }
    }

    /// Makes every later insert fail, like a full disk or exhausted quota.
    #[cfg(test)]
    pub(crate) fn reject_writes(&self) {
        self.conn
            .execute_batch(
                "CREATE TRIGGER reject_writes BEFORE INSERT ON kv_cache
                 BEGIN SELECT RAISE(ABORT, 'database or disk is full'); END;",
            )
            .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Overlay, PlanStatus};
    use std::collections::BTreeMap;

    #[test]
    fn missing_key_is_absent() {
        let cache = LocalCache::in_memory().unwrap();
        assert!(cache.get::<Overlay>("nope").is_none());
        assert!(!cache.contains("nope"));
    }

    #[test]
    fn set_then_get_returns_value() {
        let cache = LocalCache::in_memory().unwrap();
        let mut plan: BTreeMap<usize, PlanStatus> = BTreeMap::new();
        plan.insert(4, PlanStatus::Completed);

        cache.set("plan", &plan);
        assert_eq!(cache.get::<BTreeMap<usize, PlanStatus>>("plan"), Some(plan));
    }

    #[test]
    fn corrupt_json_reads_as_absent() {
        let cache = LocalCache::in_memory().unwrap();
        cache.set_raw("status", "{not json");
        assert!(cache.get::<serde_json::Value>("status").is_none());
    }

    #[test]
    fn wrong_shape_reads_as_absent() {
        let cache = LocalCache::in_memory().unwrap();
        cache.set("status", &vec![1, 2, 3]);
        assert!(cache.get::<Overlay>("status").is_none());
    }

    #[test]
    fn remove_deletes_entry() {
        let cache = LocalCache::in_memory().unwrap();
        cache.set("theme", "light");
        cache.remove("theme");
        assert!(cache.get::<String>("theme").is_none());
    }

    #[test]
    fn survives_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        {
            let cache = LocalCache::open(&path).unwrap();
            cache.set("theme", "light");
        }
        let cache = LocalCache::open(&path).unwrap();
        assert_eq!(cache.get::<String>("theme").as_deref(), Some("light"));
    }

    #[test]
    fn failed_write_is_logged_and_dropped() {
        let cache = LocalCache::in_memory().unwrap();
        cache.set("theme", "dark");
        cache.reject_writes();

        cache.set("theme", "light");
        cache.set("notes", &BTreeMap::from([(1, "sliding window")]));

        assert_eq!(cache.get::<String>("theme").as_deref(), Some("dark"));
        assert!(!cache.contains("notes"));
    }
}
