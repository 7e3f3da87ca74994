// src/events.rs

use crate::models::{Problem, StudyPlanEntry};
use crate::reconcile::SyncOutcome;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    DataChanged,
    StatusChanged,
    StudyPlanChanged,
    SyncComplete,
    ImportComplete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Base dataset loaded.
    Ready,
    /// Any overlay mutation or reconciliation.
    DataChanged,
    StatusChanged(Problem),
    StudyPlanChanged { index: usize, entry: StudyPlanEntry },
    SyncComplete(SyncOutcome),
    ImportComplete,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Ready => EventKind::Ready,
            Event::DataChanged => EventKind::DataChanged,
            Event::StatusChanged(_) => EventKind::StatusChanged,
            Event::StudyPlanChanged { .. } => EventKind::StudyPlanChanged,
            Event::SyncComplete(_) => EventKind::SyncComplete,
            Event::ImportComplete => EventKind::ImportComplete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(usize);

type Handler = Box<dyn FnMut(&Event) + Send>;

/// In-process observer registry. Handlers for one kind run synchronously,
/// in registration order, on the emitting thread.
#[derive(Default)]
pub struct EventBus {
    next_id: usize,
    handlers: Vec<(SubscriptionId, EventKind, Handler)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, kind, Box::new(handler)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sid, _, _)| *sid != id);
        self.handlers.len() != before
    }

    pub fn emit(&mut self, event: &Event) {
        let kind = event.kind();
        debug!("[EVENT] {:?}", kind);
        for (_, _, handler) in self.handlers.iter_mut().filter(|(_, k, _)| *k == kind) {
            handler(event);
        }
    }
}
