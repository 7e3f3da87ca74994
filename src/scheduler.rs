// src/scheduler.rs

use crate::models::{Identity, Overlay};
use crate::remote::RemoteStore;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

struct PendingPush {
    identity: Identity,
    overlay: Overlay,
}

/// The single pending push. `generation` bumps on every schedule, flush and
/// cancel, so a timer only ever fires the job it was armed for.
#[derive(Default)]
struct Slot {
    generation: u64,
    job: Option<PendingPush>,
}

/// Coalesces bursts of overlay changes into one upstream write.
///
/// Each `schedule` replaces the pending snapshot and restarts the window;
/// only the latest full overlay is pushed. Once a timer has picked up its
/// job the write is in flight and nothing here will cancel it.
pub struct SyncScheduler {
    remote: Arc<dyn RemoteStore>,
    debounce: Duration,
    slot: Arc<Mutex<Slot>>,
    timer: Option<JoinHandle<()>>,
}

impl SyncScheduler {
    pub fn new(remote: Arc<dyn RemoteStore>, debounce: Duration) -> Self {
        SyncScheduler {
            remote,
            debounce,
            slot: Arc::new(Mutex::new(Slot::default())),
            timer: None,
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn has_pending(&self) -> bool {
        lock(&self.slot).job.is_some()
    }

    /// Arms (or re-arms) the debounce window. Unauthenticated callers stay
    /// local-only.
    pub fn schedule(&mut self, identity: Option<&Identity>, overlay: Overlay) {
        let Some(identity) = identity else {
            debug!("[SYNC] Not signed in, change stays local");
            return;
        };

        let (generation, superseded) = {
            let mut slot = lock(&self.slot);
            slot.generation += 1;
            let superseded = slot
                .job
                .replace(PendingPush {
                    identity: identity.clone(),
                    overlay,
                })
                .is_some();
            (slot.generation, superseded)
        };
        if superseded {
            self.abort_timer();
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("[SYNC] No async runtime, push held until flush");
                return;
            }
        };

        let slot = Arc::clone(&self.slot);
        let remote = Arc::clone(&self.remote);
        let delay = self.debounce;
        debug!("[SYNC] Push armed for {:?} (generation {})", delay, generation);

        self.timer = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let job = {
                let mut slot = lock(&slot);
                if slot.generation == generation {
                    slot.job.take()
                } else {
                    None
                }
            };
            if let Some(job) = job {
                push(remote.as_ref(), job).await;
            }
        }));
    }

    /// Fires the pending push now, if there is one, and waits for it.
    pub async fn flush(&mut self) -> bool {
        let job = self.take_pending();
        match job {
            Some(job) => {
                self.abort_timer();
                push(self.remote.as_ref(), job).await
            }
            None => false,
        }
    }

    /// Drops the pending push without sending it.
    pub fn cancel(&mut self) -> bool {
        let dropped = self.take_pending().is_some();
        if dropped {
            self.abort_timer();
            info!("[SYNC] Pending push discarded");
        }
        dropped
    }

    /// Pushes `overlay` immediately, superseding anything pending.
    pub async fn push_now(&mut self, identity: Option<&Identity>, overlay: Overlay) -> bool {
        let Some(identity) = identity else {
            debug!("[SYNC] Not signed in, immediate push skipped");
            return false;
        };
        if self.take_pending().is_some() {
            self.abort_timer();
        }
        let job = PendingPush {
            identity: identity.clone(),
            overlay,
        };
        push(self.remote.as_ref(), job).await
    }

    fn take_pending(&mut self) -> Option<PendingPush> {
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        slot.job.take()
    }

    fn abort_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

async fn push(remote: &dyn RemoteStore, job: PendingPush) -> bool {
    match remote.push_overlay(&job.identity, &job.overlay).await {
        Ok(()) => {
            info!(
                "[SYNC] Pushed overlay for {} ({} statuses, {} notes, {} plan days)",
                job.identity.uid,
                job.overlay.status.len(),
                job.overlay.notes.len(),
                job.overlay.study_plan.len()
            );
            true
        }
        Err(e) => {
            // Next change re-arms the window and retries with fresh state
            warn!("[SYNC] Push failed for {}: {}", job.identity.uid, e);
            false
        }
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryRemoteStore;
    use tokio::time::sleep;

    const WINDOW: Duration = Duration::from_millis(2000);

    fn overlay_with_note(text: &str) -> Overlay {
        let mut overlay = Overlay::default();
        overlay.notes.insert(1, text.to_string());
        overlay
    }

    fn setup() -> (Arc<MemoryRemoteStore>, SyncScheduler, Identity) {
        let remote = Arc::new(MemoryRemoteStore::new());
        let scheduler = SyncScheduler::new(remote.clone(), WINDOW);
        (remote, scheduler, Identity::new("u1"))
    }

    #[tokio::test(start_paused = true)]
    async fn push_waits_for_window() {
        let (remote, mut scheduler, who) = setup();
        scheduler.schedule(Some(&who), overlay_with_note("a"));

        sleep(Duration::from_millis(1000)).await;
        assert!(remote.pushes().is_empty());
        assert!(scheduler.has_pending());

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(remote.pushes().len(), 1);
        assert!(!scheduler.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_latest_snapshot() {
        let (remote, mut scheduler, who) = setup();
        for text in ["a", "b", "c", "d", "e"] {
            scheduler.schedule(Some(&who), overlay_with_note(text));
            sleep(Duration::from_millis(500)).await;
        }
        assert!(remote.pushes().is_empty());

        sleep(Duration::from_millis(3000)).await;
        let pushes = remote.pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].1, overlay_with_note("e"));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_pushes_immediately_once() {
        let (remote, mut scheduler, who) = setup();
        scheduler.schedule(Some(&who), overlay_with_note("a"));

        assert!(scheduler.flush().await);
        assert_eq!(remote.pushes().len(), 1);

        sleep(Duration::from_millis(5000)).await;
        assert_eq!(remote.pushes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_without_pending_is_noop() {
        let (remote, mut scheduler, _) = setup();
        assert!(!scheduler.flush().await);
        assert!(remote.pushes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_push() {
        let (remote, mut scheduler, who) = setup();
        scheduler.schedule(Some(&who), overlay_with_note("a"));
        assert!(scheduler.cancel());

        sleep(Duration::from_millis(5000)).await;
        assert!(remote.pushes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unauthenticated_changes_stay_local() {
        let (remote, mut scheduler, _) = setup();
        scheduler.schedule(None, overlay_with_note("a"));
        assert!(!scheduler.has_pending());
        assert!(!scheduler.push_now(None, overlay_with_note("b")).await);

        sleep(Duration::from_millis(5000)).await;
        assert!(remote.pushes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_push_is_retried_by_next_change() {
        let (remote, mut scheduler, who) = setup();
        remote.set_online(false);
        scheduler.schedule(Some(&who), overlay_with_note("a"));
        sleep(Duration::from_millis(2500)).await;
        assert!(remote.pushes().is_empty());

        remote.set_online(true);
        scheduler.schedule(Some(&who), overlay_with_note("b"));
        sleep(Duration::from_millis(2500)).await;
        let pushes = remote.pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].1, overlay_with_note("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn push_now_supersedes_pending() {
        let (remote, mut scheduler, who) = setup();
        scheduler.schedule(Some(&who), overlay_with_note("old"));
        assert!(scheduler.push_now(Some(&who), overlay_with_note("new")).await);

        sleep(Duration::from_millis(5000)).await;
        let pushes = remote.pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].1, overlay_with_note("new"));
    }
}
