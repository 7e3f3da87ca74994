// src/store.rs

//! The owned progress store: one instance per session, passed to whoever
//! needs it.
//!
//! Flow: [`ProgressStore::init`] loads the base dataset once, then
//! [`ProgressStore::sign_in`] reconciles it against the remote and local
//! overlays. Mutations update the working model and the local cache
//! synchronously and arm the debounced upstream push.

use crate::bootstrap::BootstrapLoader;
use crate::config::TrackerConfig;
use crate::constants::{
    CACHE_NOTES_KEY, CACHE_STATUS_KEY, CACHE_STUDYPLAN_KEY, CACHE_THEME_KEY, DEBOUNCE_MS,
    DEFAULT_THEME, EXPORT_VERSION,
};
use crate::database::LocalCache;
use crate::error::{Result, TrackerError};
use crate::events::{Event, EventBus, EventKind, SubscriptionId};
use crate::models::{
    Dataset, DifficultyCounts, ExportDocument, Identity, ImportDocument, Metadata, NotesOverlay,
    Overlay, PlanStatus, Problem, ProblemFilter, ProblemStatus, StatusEntry, StatusOverlay,
    StudyPlanEntry, StudyPlanOverlay, TopicSummary,
};
use crate::reconcile::{apply_overlay, reconcile, reset_to_base, SyncOutcome};
use crate::remote::{FileRemoteStore, OfflineRemote, RemoteStore};
use crate::scheduler::SyncScheduler;
use crate::stats;
use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct ProgressStore {
    model: Dataset,
    cache: LocalCache,
    remote: Arc<dyn RemoteStore>,
    loader: BootstrapLoader,
    scheduler: SyncScheduler,
    bus: EventBus,
    identity: Option<Identity>,
    clock: Clock,
    ready: bool,
}

impl ProgressStore {
    pub fn new(cache: LocalCache, remote: Arc<dyn RemoteStore>) -> Self {
        ProgressStore {
            model: Dataset::default(),
            cache,
            loader: BootstrapLoader::new(Arc::clone(&remote)),
            scheduler: SyncScheduler::new(
                Arc::clone(&remote),
                Duration::from_millis(DEBOUNCE_MS),
            ),
            remote,
            bus: EventBus::new(),
            identity: None,
            clock: Arc::new(|| Utc::now().date_naive()),
            ready: false,
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        if let Some(parent) = config.cache_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let cache = LocalCache::open(&config.cache_path)?;
        let remote: Arc<dyn RemoteStore> = match &config.remote_dir {
            Some(dir) => Arc::new(FileRemoteStore::new(dir)),
            None => Arc::new(OfflineRemote),
        };

        let mut store = ProgressStore::new(cache, remote).with_debounce(config.debounce());
        if let Some(payload) = config.fallback_payload()? {
            store = store.with_fallback(payload);
        }
        Ok(store)
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.scheduler = SyncScheduler::new(Arc::clone(&self.remote), debounce);
        self
    }

    pub fn with_fallback(mut self, payload: impl Into<String>) -> Self {
        self.loader = BootstrapLoader::new(Arc::clone(&self.remote)).with_fallback(payload);
        self
    }

    /// Overrides "today" for solve dates and streaks.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    // --- Lifecycle ---

    /// Loads the base dataset and restores any progress cached on this
    /// device, so an unauthenticated session starts where the last one left off.
    pub async fn init(&mut self) -> Result<()> {
        self.model = self.loader.load(&self.cache).await?;
        reset_to_base(&mut self.model);

        let local = self.local_overlay();
        if !local.is_empty() {
            apply_overlay(&mut self.model, &local);
            debug!("[STORE] Restored local progress ({} statuses)", local.status.len());
        }

        self.ready = true;
        info!("[STORE] Ready with {} problems", self.model.problems.len());
        self.bus.emit(&Event::Ready);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Reconciles the working model for `identity`. Runs on every sign-in,
    /// including a second sign-in after sign-out.
    pub async fn sign_in(&mut self, identity: Identity) -> Result<SyncOutcome> {
        if !self.ready {
            self.init().await?;
        }
        // Switching users: the previous user's cached progress must not
        // migrate into the new account
        if self
            .identity
            .as_ref()
            .is_some_and(|current| current.uid != identity.uid)
        {
            self.sign_out();
        }
        info!("[STORE] Signing in {}", identity.uid);

        let remote = match self.remote.fetch_overlay(&identity).await {
            Ok(overlay) => overlay,
            Err(e) => {
                warn!("[STORE] Remote overlay unavailable, using local cache: {}", e);
                None
            }
        };
        let local = self.local_overlay();
        self.identity = Some(identity);

        let outcome = reconcile(&mut self.model, remote.as_ref(), Some(&local));
        match outcome {
            SyncOutcome::Downloaded => {
                if let Some(overlay) = &remote {
                    self.write_overlay(overlay);
                }
            }
            SyncOutcome::Migrated => {
                self.scheduler
                    .push_now(self.identity.as_ref(), local)
                    .await;
            }
            SyncOutcome::Fresh => {}
        }

        self.bus.emit(&Event::DataChanged);
        self.bus.emit(&Event::SyncComplete(outcome));
        Ok(outcome)
    }

    /// Drops any not-yet-fired push, then wipes this user's progress from
    /// the model and the cache. Call [`flush_sync`](Self::flush_sync) first
    /// to keep the last few seconds of changes.
    pub fn sign_out(&mut self) {
        if self.scheduler.cancel() {
            warn!("[STORE] Sign-out discarded an unsynced push");
        }
        if let Some(identity) = self.identity.take() {
            info!("[STORE] Signed out {}", identity.uid);
        }
        self.clear_user_progress();
    }

    pub fn clear_user_progress(&mut self) {
        reset_to_base(&mut self.model);
        self.cache.remove(CACHE_STATUS_KEY);
        self.cache.remove(CACHE_NOTES_KEY);
        self.cache.remove(CACHE_STUDYPLAN_KEY);
        self.bus.emit(&Event::DataChanged);
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    // --- Mutations ---

    pub fn toggle_status(&mut self, problem_id: i64) -> Option<Problem> {
        let today = (self.clock)();
        let problem = self.model.problem_mut(problem_id)?;
        if problem.is_solved() {
            problem.status = ProblemStatus::Unsolved;
            problem.date_solved = None;
        } else {
            problem.status = ProblemStatus::Solved;
            problem.date_solved = Some(today);
        }
        let problem = problem.clone();
        debug!(
            "[STORE] Problem {} -> {}",
            problem.id,
            problem.status.as_str()
        );

        let mut saved: StatusOverlay = self.cache.get(CACHE_STATUS_KEY).unwrap_or_default();
        saved.insert(
            problem_id,
            StatusEntry {
                status: Some(problem.status),
                date_solved: problem.date_solved,
            },
        );
        self.cache.set(CACHE_STATUS_KEY, &saved);

        self.bus.emit(&Event::StatusChanged(problem.clone()));
        self.bus.emit(&Event::DataChanged);
        self.schedule_push();
        Some(problem)
    }

    pub fn update_notes(&mut self, problem_id: i64, text: impl Into<String>) -> Option<Problem> {
        let problem = self.model.problem_mut(problem_id)?;
        problem.notes = text.into();
        let problem = problem.clone();

        let mut saved: NotesOverlay = self.cache.get(CACHE_NOTES_KEY).unwrap_or_default();
        saved.insert(problem_id, problem.notes.clone());
        self.cache.set(CACHE_NOTES_KEY, &saved);

        self.bus.emit(&Event::DataChanged);
        self.schedule_push();
        Some(problem)
    }

    pub fn toggle_study_plan_status(&mut self, index: usize) -> Option<StudyPlanEntry> {
        let entry = self.model.study_plan.get_mut(index)?;
        entry.status = entry.status.toggled();
        let entry = entry.clone();

        let mut saved: StudyPlanOverlay = self.cache.get(CACHE_STUDYPLAN_KEY).unwrap_or_default();
        saved.insert(index, entry.status);
        self.cache.set(CACHE_STUDYPLAN_KEY, &saved);

        self.bus.emit(&Event::StudyPlanChanged {
            index,
            entry: entry.clone(),
        });
        self.bus.emit(&Event::DataChanged);
        self.schedule_push();
        Some(entry)
    }

    /// Sends any pending push now and waits for it.
    pub async fn flush_sync(&mut self) -> bool {
        self.scheduler.flush().await
    }

    pub fn has_pending_sync(&self) -> bool {
        self.scheduler.has_pending()
    }

    fn schedule_push(&mut self) {
        let overlay = self.local_overlay();
        self.scheduler.schedule(self.identity.as_ref(), overlay);
    }

    // --- Backup ---

    /// Serialises the cached overlays; works offline.
    pub fn export_progress(&self) -> Result<String> {
        let overlay = self.local_overlay();
        let doc = ExportDocument {
            version: EXPORT_VERSION,
            exported_at: Utc::now().to_rfc3339(),
            status: overlay.status,
            notes: overlay.notes,
            study_plan: overlay.study_plan,
            theme: self.theme(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Replaces all overlays with the backup's, rebuilds the model and pushes
    /// upstream immediately. Nothing changes if the backup is rejected.
    pub async fn import_progress(&mut self, json: &str) -> Result<()> {
        let doc: ImportDocument =
            serde_json::from_str(json).map_err(|e| TrackerError::InvalidImport(e.to_string()))?;
        if doc.version == 0 {
            return Err(TrackerError::InvalidImport("version must be at least 1".into()));
        }
        if doc.version > EXPORT_VERSION {
            warn!(
                "[STORE] Backup version {} is newer than {}, importing known fields",
                doc.version, EXPORT_VERSION
            );
        }

        let overlay = Overlay {
            status: doc.status.unwrap_or_default(),
            notes: doc.notes.unwrap_or_default(),
            study_plan: doc.study_plan.unwrap_or_default(),
        };
        self.write_overlay(&overlay);
        if let Some(theme) = doc.theme {
            self.set_theme(&theme);
        }

        reset_to_base(&mut self.model);
        apply_overlay(&mut self.model, &overlay);
        info!("[STORE] Imported backup ({} statuses)", overlay.status.len());

        self.bus.emit(&Event::DataChanged);
        self.bus.emit(&Event::ImportComplete);
        self.scheduler
            .push_now(self.identity.as_ref(), overlay)
            .await;
        Ok(())
    }

    // --- Theme ---

    pub fn theme(&self) -> String {
        self.cache
            .get::<String>(CACHE_THEME_KEY)
            .unwrap_or_else(|| DEFAULT_THEME.to_string())
    }

    pub fn set_theme(&mut self, theme: &str) {
        self.cache.set(CACHE_THEME_KEY, theme);
    }

    pub fn toggle_theme(&mut self) -> String {
        let next = if self.theme() == "dark" { "light" } else { "dark" };
        self.set_theme(next);
        next.to_string()
    }

    // --- Queries ---

    pub fn dataset(&self) -> &Dataset {
        &self.model
    }

    pub fn problems(&self) -> &[Problem] {
        &self.model.problems
    }

    pub fn problem(&self, id: i64) -> Option<&Problem> {
        self.model.problem(id)
    }

    pub fn study_plan(&self) -> &[StudyPlanEntry] {
        &self.model.study_plan
    }

    pub fn topic_summary(&self) -> &[TopicSummary] {
        &self.model.topic_summary
    }

    pub fn metadata(&self) -> &Metadata {
        &self.model.metadata
    }

    pub fn solved_count(&self) -> usize {
        stats::solved_count(&self.model.problems)
    }

    pub fn solved_by_difficulty(&self) -> DifficultyCounts {
        stats::solved_by_difficulty(&self.model.problems)
    }

    pub fn solved_by_topic(&self, topic: &str) -> usize {
        stats::solved_by_topic(&self.model.problems, topic)
    }

    pub fn total_by_topic(&self, topic: &str) -> usize {
        stats::total_by_topic(&self.model.problems, topic)
    }

    pub fn streak(&self) -> u32 {
        stats::streak(&self.model.problems, (self.clock)())
    }

    pub fn recent_activity(&self, limit: usize) -> Vec<&Problem> {
        stats::recent_activity(&self.model.problems, limit)
    }

    pub fn filtered_problems(&self, filter: &ProblemFilter) -> Vec<&Problem> {
        stats::filtered_problems(&self.model.problems, filter)
    }

    pub fn study_plan_progress(&self) -> (usize, usize) {
        stats::study_plan_progress(&self.model.study_plan)
    }

    pub fn plan_status(&self, index: usize) -> Option<PlanStatus> {
        self.model.study_plan.get(index).map(|e| e.status)
    }

    // --- Events ---

    pub fn on<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.bus.subscribe(kind, handler)
    }

    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    // --- Cache Plumbing ---

    /// The three overlay namespaces as currently cached on this device.
    pub fn local_overlay(&self) -> Overlay {
        Overlay {
            status: self.cache.get(CACHE_STATUS_KEY).unwrap_or_default(),
            notes: self.cache.get(CACHE_NOTES_KEY).unwrap_or_default(),
            study_plan: self.cache.get(CACHE_STUDYPLAN_KEY).unwrap_or_default(),
        }
    }

    fn write_overlay(&self, overlay: &Overlay) {
        self.cache.set(CACHE_STATUS_KEY, &overlay.status);
        self.cache.set(CACHE_NOTES_KEY, &overlay.notes);
        self.cache.set(CACHE_STUDYPLAN_KEY, &overlay.study_plan);
    }
}
