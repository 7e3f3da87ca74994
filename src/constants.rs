// src/constants.rs

// --- Local Cache Keys ---
pub const CACHE_STATUS_KEY: &str = "lc-tracker-status";
pub const CACHE_NOTES_KEY: &str = "lc-tracker-notes";
pub const CACHE_STUDYPLAN_KEY: &str = "lc-tracker-studyplan";
pub const CACHE_DATASET_KEY: &str = "lc-tracker-appdata";
pub const CACHE_THEME_KEY: &str = "lc-tracker-theme";

pub const CACHE_FILE_NAME: &str = "dsa_tracker.db";

// --- Sync ---
pub const DEBOUNCE_MS: u64 = 2000; // Upstream push coalescing window
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

// --- Export / Import ---
pub const EXPORT_VERSION: u32 = 1;
pub const DEFAULT_THEME: &str = "dark";

// --- Remote Document Layout ---
pub const UPLOAD_CHUNK_SIZE: usize = 200; // Problems per chunk document
pub const APP_DATA_DIR: &str = "appData";
pub const USERS_DIR: &str = "users";
pub const PROGRESS_DOC: &str = "progress.json";

// --- Catalog ---
pub const DIFFICULTIES: [&str; 3] = ["Easy", "Medium", "Hard"];
