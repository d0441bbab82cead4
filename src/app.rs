use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

use crate::calendar::Event;
use crate::sync::SyncReport;

#[derive(Debug, Clone, PartialEq)]
pub enum SyncStatus {
    Synced,
    Syncing,
    Offline,
    Error(String),
}

/// What undoing an optimistic mutation means: either drop an inserted event
/// or put a displaced one back.
#[derive(Debug, Clone, PartialEq)]
pub enum Rollback {
    Remove(String),
    Restore(Box<Event>),
}

/// Client-side view state. Mutations are applied here immediately, before
/// server confirmation; if the server rejects a change only this view is
/// rolled back, and the next fetch restores the server's truth either way.
pub struct AppState {
    pub events: HashMap<String, Event>,
    pub sync_status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl AppState {
    pub fn new() -> Self {
        Self { events: HashMap::new(), sync_status: SyncStatus::Offline, last_synced_at: None }
    }

    pub fn from_cached(events: Vec<Event>) -> Self {
        let mut state = Self::new();
        state.replace_events(events);
        state
    }

    pub fn events_for_date(&self, date: NaiveDate) -> Vec<&Event> {
        let mut events: Vec<&Event> = self
            .events
            .values()
            .filter(|event| event.start.date_naive() == date)
            .collect();
        events.sort_by_key(|e| e.start);
        events
    }

    /// Optimistically inserts a just-created event.
    pub fn apply_create(&mut self, event: Event) -> Rollback {
        let id = event.id.clone();
        self.events.insert(id.clone(), event);
        Rollback::Remove(id)
    }

    /// Optimistically applies an edit. An edit to an event that was not in
    /// view inserts it, so its undo is a removal.
    pub fn apply_update(&mut self, event: Event) -> Rollback {
        let id = event.id.clone();
        match self.events.insert(id.clone(), event) {
            Some(previous) => Rollback::Restore(Box::new(previous)),
            None => Rollback::Remove(id),
        }
    }

    /// Optimistically removes an event. `None` when it was not cached.
    pub fn apply_delete(&mut self, event_id: &str) -> Option<Rollback> {
        self.events
            .remove(event_id)
            .map(|previous| Rollback::Restore(Box::new(previous)))
    }

    /// Undoes one optimistic mutation after a server rejection.
    pub fn rollback(&mut self, rollback: Rollback) {
        match rollback {
            Rollback::Remove(id) => {
                self.events.remove(&id);
            }
            Rollback::Restore(event) => {
                self.events.insert(event.id.clone(), *event);
            }
        }
    }

    /// Swaps in the authoritative server list after a sync.
    pub fn replace_events(&mut self, events: Vec<Event>) {
        self.events = events.into_iter().map(|event| (event.id.clone(), event)).collect();
    }

    pub fn apply_sync_report(&mut self, report: SyncReport, at: DateTime<Utc>) {
        self.replace_events(report.events);
        self.last_synced_at = Some(at);
        self.sync_status = if report.errors.is_empty() {
            SyncStatus::Synced
        } else {
            SyncStatus::Error(report.errors.join("; "))
        };
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
