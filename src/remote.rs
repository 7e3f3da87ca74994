// src/remote.rs

use crate::catalog::chunk_problems;
use crate::constants::{APP_DATA_DIR, PROGRESS_DOC, USERS_DIR};
use crate::error::{Result, TrackerError};
use crate::models::{
    Dataset, Identity, Metadata, NotesOverlay, Overlay, Problem, StatusOverlay, StudyPlanEntry,
    StudyPlanOverlay, TopicSummary,
};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Authoritative per-user overlay storage plus the shared base catalog.
///
/// Implementations report transport failures as
/// [`TrackerError::RemoteUnavailable`]; callers degrade rather than abort.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch_base_catalog(&self) -> Result<Option<Dataset>>;
    async fn fetch_overlay(&self, identity: &Identity) -> Result<Option<Overlay>>;
    async fn push_overlay(&self, identity: &Identity, overlay: &Overlay) -> Result<()>;
}

/// Stand-in used when no remote is configured: every call is unavailable.
pub struct OfflineRemote;

#[async_trait]
impl RemoteStore for OfflineRemote {
    async fn fetch_base_catalog(&self) -> Result<Option<Dataset>> {
        Err(TrackerError::RemoteUnavailable("offline".into()))
    }

    async fn fetch_overlay(&self, _identity: &Identity) -> Result<Option<Overlay>> {
        Err(TrackerError::RemoteUnavailable("offline".into()))
    }

    async fn push_overlay(&self, _identity: &Identity, _overlay: &Overlay) -> Result<()> {
        Err(TrackerError::RemoteUnavailable("offline".into()))
    }
}

// --- Stored Document Shapes ---

/// The per-user progress document. Fields are spelled out rather than
/// flattened: flattened maps lose their integer keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDocument {
    #[serde(default)]
    pub status: StatusOverlay,
    #[serde(default)]
    pub notes: NotesOverlay,
    #[serde(default)]
    pub study_plan: StudyPlanOverlay,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProblemChunk {
    problems: Vec<Problem>,
    chunk_index: usize,
    total_chunks: usize,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudyPlanDoc {
    study_plan: Vec<StudyPlanEntry>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopicSummaryDoc {
    topic_summary: Vec<TopicSummary>,
}

// --- File-backed Document Store ---

/// Document store laid out as JSON files under a root directory:
///
/// ```text
/// appData/metadata.json
/// appData/problems_0.json, problems_1.json, ...
/// appData/studyPlan.json
/// appData/topicSummary.json
/// users/<uid>/progress.json
/// ```
///
/// The root may sit on a synced or network mount; an unreachable root is
/// reported as `RemoteUnavailable`. File I/O runs on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct FileRemoteStore {
    root: PathBuf,
}

impl FileRemoteStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileRemoteStore { root: root.into() }
    }

    fn progress_doc(&self, identity: &Identity) -> Result<PathBuf> {
        let uid = checked_uid(&identity.uid)?;
        Ok(self.root.join(USERS_DIR).join(uid).join(PROGRESS_DOC))
    }

    /// Publishes a catalog in the chunked layout, replacing any previous one.
    ///
    /// The new catalog is written to a staging directory and swapped in
    /// with renames, so a failed upload leaves the previous one readable.
    pub fn upload_base_catalog(&self, dataset: &Dataset) -> Result<usize> {
        let live = self.root.join(APP_DATA_DIR);
        let staging = self.root.join(format!("{}.staging", APP_DATA_DIR));
        let retired = self.root.join(format!("{}.old", APP_DATA_DIR));
        for leftover in [&staging, &retired] {
            if leftover.exists() {
                fs::remove_dir_all(leftover)?;
            }
        }
        fs::create_dir_all(&staging)?;

        let chunks = chunk_problems(&dataset.problems);
        let total_chunks = chunks.len();
        for (chunk_index, chunk) in chunks.into_iter().enumerate() {
            let doc = ProblemChunk {
                problems: chunk.to_vec(),
                chunk_index,
                total_chunks,
            };
            write_json(&doc_path(&staging, &format!("problems_{}", chunk_index)), &doc)?;
            debug!(
                "[REMOTE] Chunk {}/{} ({} problems)",
                chunk_index + 1,
                total_chunks,
                chunk.len()
            );
        }

        write_json(
            &doc_path(&staging, "studyPlan"),
            &StudyPlanDoc {
                study_plan: dataset.study_plan.clone(),
            },
        )?;
        write_json(
            &doc_path(&staging, "topicSummary"),
            &TopicSummaryDoc {
                topic_summary: dataset.topic_summary.clone(),
            },
        )?;

        let mut metadata = dataset.metadata.clone();
        metadata.uploaded_at = Some(Utc::now().to_rfc3339());
        write_json(&doc_path(&staging, "metadata"), &metadata)?;

        if live.exists() {
            fs::rename(&live, &retired)?;
        }
        fs::rename(&staging, &live)?;
        if retired.exists() {
            if let Err(e) = fs::remove_dir_all(&retired) {
                warn!("[REMOTE] Could not remove previous catalog: {}", e);
            }
        }

        info!(
            "[REMOTE] Uploaded catalog: {} problems in {} chunks, {} plan entries, {} topics",
            dataset.problems.len(),
            total_chunks,
            dataset.study_plan.len(),
            dataset.topic_summary.len()
        );
        Ok(total_chunks)
    }

    fn read_catalog(&self) -> Result<Option<Dataset>> {
        let dir = self.root.join(APP_DATA_DIR);

        // Metadata gates the rest of the catalog
        let metadata: Metadata = match read_json(&doc_path(&dir, "metadata"))? {
            Some(m) => m,
            None => return Ok(None),
        };

        let mut problems = Vec::new();
        let mut chunk_index = 0;
        while let Some(chunk) =
            read_json::<ProblemChunk>(&doc_path(&dir, &format!("problems_{}", chunk_index)))?
        {
            problems.extend(chunk.problems);
            chunk_index += 1;
        }

        let study_plan = read_json::<StudyPlanDoc>(&doc_path(&dir, "studyPlan"))?
            .map(|d| d.study_plan)
            .unwrap_or_default();
        let topic_summary = read_json::<TopicSummaryDoc>(&doc_path(&dir, "topicSummary"))?
            .map(|d| d.topic_summary)
            .unwrap_or_default();

        debug!(
            "[REMOTE] Read catalog: {} problems from {} chunks",
            problems.len(),
            chunk_index
        );
        Ok(Some(Dataset {
            problems,
            study_plan,
            topic_summary,
            metadata,
        }))
    }

    fn read_progress(&self, identity: &Identity) -> Result<Option<Overlay>> {
        let doc: Option<ProgressDocument> = read_json(&self.progress_doc(identity)?)?;
        Ok(doc.map(|d| Overlay {
            status: d.status,
            notes: d.notes,
            study_plan: d.study_plan,
        }))
    }

    fn write_progress(&self, identity: &Identity, doc: &ProgressDocument) -> Result<()> {
        let path = self.progress_doc(identity)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(remote_io)?;
        }
        write_json(&path, doc).map_err(|e| match e {
            TrackerError::Io(io) => remote_io(io),
            other => other,
        })
    }
}

#[async_trait]
impl RemoteStore for FileRemoteStore {
    async fn fetch_base_catalog(&self) -> Result<Option<Dataset>> {
        let store = self.clone();
        off_runtime(move || store.read_catalog()).await
    }

    async fn fetch_overlay(&self, identity: &Identity) -> Result<Option<Overlay>> {
        let store = self.clone();
        let identity = identity.clone();
        off_runtime(move || store.read_progress(&identity)).await
    }

    async fn push_overlay(&self, identity: &Identity, overlay: &Overlay) -> Result<()> {
        let doc = ProgressDocument {
            status: overlay.status.clone(),
            notes: overlay.notes.clone(),
            study_plan: overlay.study_plan.clone(),
            last_updated: Some(Utc::now().to_rfc3339()),
            user_email: identity.email.clone(),
        };
        let store = self.clone();
        let identity = identity.clone();
        off_runtime(move || store.write_progress(&identity, &doc)).await
    }
}

/// A uid names one directory under `users/`, so it has to be a single
/// plain path component.
fn checked_uid(uid: &str) -> Result<&str> {
    let plain = !uid.is_empty()
        && uid != "."
        && uid != ".."
        && !uid.contains(|c: char| matches!(c, '/' | '\\' | ':' | '\0'));
    if plain {
        Ok(uid)
    } else {
        Err(TrackerError::RemoteUnavailable(format!(
            "user id {:?} is not usable as a document path",
            uid
        )))
    }
}

async fn off_runtime<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| TrackerError::RemoteUnavailable(e.to_string()))?
}

fn doc_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.json", name))
}

fn remote_io(e: std::io::Error) -> TrackerError {
    TrackerError::RemoteUnavailable(e.to_string())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(remote_io(e)),
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| TrackerError::RemoteUnavailable(format!("{}: {}", path.display(), e)))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)
        .map_err(|e| TrackerError::RemoteUnavailable(e.to_string()))?;
    // Write-then-rename so a reader never sees half a document
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, raw)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

// --- In-memory Store ---

/// Remote double that keeps everything in memory and records every push.
/// Flip `set_online(false)` to make all calls fail.
#[derive(Default)]
pub struct MemoryRemoteStore {
    catalog: Mutex<Option<Dataset>>,
    overlays: Mutex<Vec<(String, Overlay)>>,
    pushes: Mutex<Vec<(Identity, Overlay)>>,
    offline: AtomicBool,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(self, dataset: Dataset) -> Self {
        *lock(&self.catalog) = Some(dataset);
        self
    }

    pub fn with_overlay(self, uid: &str, overlay: Overlay) -> Self {
        lock(&self.overlays).push((uid.to_string(), overlay));
        self
    }

    pub fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }

    /// Every successful push, oldest first.
    pub fn pushes(&self) -> Vec<(Identity, Overlay)> {
        lock(&self.pushes).clone()
    }

    pub fn stored_overlay(&self, uid: &str) -> Option<Overlay> {
        lock(&self.overlays)
            .iter()
            .rev()
            .find(|(u, _)| u == uid)
            .map(|(_, o)| o.clone())
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(TrackerError::RemoteUnavailable("memory store offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn fetch_base_catalog(&self) -> Result<Option<Dataset>> {
        self.check_online()?;
        Ok(lock(&self.catalog).clone())
    }

    async fn fetch_overlay(&self, identity: &Identity) -> Result<Option<Overlay>> {
        self.check_online()?;
        Ok(self.stored_overlay(&identity.uid))
    }

    async fn push_overlay(&self, identity: &Identity, overlay: &Overlay) -> Result<()> {
        self.check_online()?;
        lock(&self.overlays).push((identity.uid.clone(), overlay.clone()));
        lock(&self.pushes).push((identity.clone(), overlay.clone()));
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
