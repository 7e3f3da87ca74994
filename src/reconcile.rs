// src/reconcile.rs

use crate::models::{Dataset, Overlay, PlanStatus, ProblemStatus};
use log::{debug, info};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    /// A remote overlay existed and was applied.
    Downloaded,
    /// No remote overlay; local progress was applied and must be pushed once.
    Migrated,
    /// Nothing anywhere.
    Fresh,
}

impl SyncOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::Downloaded => "downloaded",
            SyncOutcome::Migrated => "migrated",
            SyncOutcome::Fresh => "fresh",
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Public Interface ---

/// Rebuilds the working model from the base dataset and the available
/// overlays. The model is always reset first, so running this again with
/// the same inputs yields the same model.
///
/// Priority: a non-empty remote overlay wins outright and local progress is
/// ignored. Only when the remote has nothing is the local overlay applied,
/// and the caller is then expected to push it upstream exactly once.
pub fn reconcile(
    model: &mut Dataset,
    remote: Option<&Overlay>,
    local: Option<&Overlay>,
) -> SyncOutcome {
    // 1. Wipe whatever a previous session left behind
    reset_to_base(model);

    // 2. Remote is authoritative once it exists
    if let Some(overlay) = remote.filter(|o| !o.is_empty()) {
        apply_overlay(model, overlay);
        info!("[SYNC] Applied remote overlay ({} statuses)", overlay.status.len());
        return SyncOutcome::Downloaded;
    }

    // 3. One-time local-to-cloud migration
    if let Some(overlay) = local.filter(|o| !o.is_empty()) {
        apply_overlay(model, overlay);
        info!("[SYNC] Applied local overlay for migration ({} statuses)", overlay.status.len());
        return SyncOutcome::Migrated;
    }

    // 4. Fresh user
    info!("[SYNC] No overlay found, starting fresh");
    SyncOutcome::Fresh
}

/// Restores every overlay field to its default state.
pub fn reset_to_base(model: &mut Dataset) {
    for p in &mut model.problems {
        p.status = ProblemStatus::Unsolved;
        p.date_solved = None;
        p.notes.clear();
    }
    for entry in &mut model.study_plan {
        entry.status = PlanStatus::Pending;
    }
}

/// Merges one overlay onto the model: statuses, then notes, then the study
/// plan. Ids and indices the catalog does not know are skipped.
pub fn apply_overlay(model: &mut Dataset, overlay: &Overlay) {
    let mut matched = 0;

    for p in &mut model.problems {
        if let Some(entry) = overlay.status.get(&p.id) {
            // Missing fields keep the current value
            if let Some(status) = entry.status {
                p.status = status;
            }
            if let Some(date) = entry.date_solved {
                p.date_solved = Some(date);
            }
            if p.status == ProblemStatus::Unsolved {
                p.date_solved = None;
            }
            matched += 1;
        }
    }

    for p in &mut model.problems {
        if let Some(text) = overlay.notes.get(&p.id) {
            p.notes = text.clone();
        }
    }

    for (index, entry) in model.study_plan.iter_mut().enumerate() {
        if let Some(status) = overlay.study_plan.get(&index) {
            entry.status = *status;
        }
    }

    let skipped_status = overlay.status.len().saturating_sub(matched);
    let skipped_plan = overlay
        .study_plan
        .keys()
        .filter(|i| **i >= model.study_plan.len())
        .count();
    if skipped_status > 0 || skipped_plan > 0 {
        debug!(
            "[SYNC] Ignored unknown overlay keys: {} problem ids, {} plan indices",
            skipped_status, skipped_plan
        );
    }
}
