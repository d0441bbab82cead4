use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::calendar::{Event, EventDraft};
use crate::storage::{Store, StoreError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// An event as the offline client recorded it, identified by the id the
/// client generated before any server round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalEvent {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    pub color: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub created: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    /// The full authoritative server list after the batch, for wholesale
    /// replacement of the client cache.
    pub events: Vec<Event>,
}

/// Merges offline-created events into the server set. Sync is one-directional
/// and creation-only: a local id is persisted at most once, and existing
/// server events are never overwritten from a local copy.
pub struct SyncCoordinator<'a> {
    store: &'a Store,
}

impl<'a> SyncCoordinator<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn sync(&self, user_id: &str, local_events: &[LocalEvent]) -> Result<SyncReport, SyncError> {
        let existing = self.store.events_for_user(user_id)?;
        let mut server_ids: HashSet<String> =
            existing.iter().map(|event| event.id.clone()).collect();
        let mut known_local_ids: HashSet<String> =
            existing.iter().filter_map(|event| event.local_id.clone()).collect();

        // Offline events land on the default calendar; creating it lazily
        // also covers a first sync from a brand-new account.
        let calendars = self.store.calendars_for_user(user_id)?;
        let default_calendar = calendars
            .iter()
            .find(|calendar| calendar.is_default)
            .unwrap_or(&calendars[0]);

        let mut created = 0;
        let mut skipped = 0;
        let mut errors = Vec::new();

        for local in local_events {
            // Re-submission of an already-synced server event.
            if server_ids.contains(&local.id) {
                skipped += 1;
                continue;
            }
            // Duplicate sync attempt for an offline event.
            if known_local_ids.contains(&local.id) {
                skipped += 1;
                continue;
            }

            let title = if local.title.trim().is_empty() {
                "(untitled)".to_string()
            } else {
                local.title.clone()
            };
            let draft = EventDraft {
                title,
                description: local.description.clone(),
                start: local.start,
                end: local.end,
                all_day: local.all_day,
                color: local.color.clone(),
                location: local.location.clone(),
                local_id: Some(local.id.clone()),
            };
            match self.store.create_event(user_id, &default_calendar.id, draft) {
                Ok(event) => {
                    // Recorded immediately so a duplicate later in this same
                    // batch is caught too.
                    server_ids.insert(event.id);
                    known_local_ids.insert(local.id.clone());
                    created += 1;
                }
                Err(err) => {
                    warn!(local_id = %local.id, error = %err, "failed to sync event");
                    errors.push(format!("event \"{}\": {}", local.title, err));
                }
            }
        }

        let events = self.store.events_for_user(user_id)?;
        info!(user_id, created, skipped, errors = errors.len(), "sync completed");
        Ok(SyncReport { created, skipped, errors, events })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rusqlite::Connection;

    fn create_test_store() -> Store {
        let store = Store::new(Connection::open_in_memory().unwrap());
        store.migrate().unwrap();
        store
    }

    fn local_event(id: &str, title: &str, start_hour: u32) -> LocalEvent {
        let start = Utc.with_ymd_and_hms(2025, 6, 2, start_hour, 0, 0).unwrap();
        LocalEvent {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            start,
            end: start + chrono::Duration::hours(1),
            all_day: false,
            color: None,
            location: None,
        }
    }

    #[test]
    fn first_sync_creates_every_event() {
        let store = create_test_store();
        let coordinator = SyncCoordinator::new(&store);
        let batch =
            vec![local_event("local-1", "Dentist", 9), local_event("local-2", "Gym", 18)];

        let report = coordinator.sync("user1", &batch).unwrap();

        assert_eq!(report.created, 2);
        assert_eq!(report.skipped, 0);
        assert!(report.errors.is_empty());
        assert_eq!(report.events.len(), 2);
    }

    #[test]
    fn second_sync_of_the_same_batch_skips_everything() {
        let store = create_test_store();
        let coordinator = SyncCoordinator::new(&store);
        let batch =
            vec![local_event("local-1", "Dentist", 9), local_event("local-2", "Gym", 18)];

        coordinator.sync("user1", &batch).unwrap();
        let report = coordinator.sync("user1", &batch).unwrap();

        assert_eq!(report.created, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.events.len(), 2);
    }

    #[test]
    fn duplicate_ids_within_one_batch_are_caught() {
        let store = create_test_store();
        let coordinator = SyncCoordinator::new(&store);
        let batch =
            vec![local_event("local-1", "Dentist", 9), local_event("local-1", "Dentist", 9)];

        let report = coordinator.sync("user1", &batch).unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn resubmitted_server_id_is_skipped() {
        let store = create_test_store();
        let coordinator = SyncCoordinator::new(&store);
        let first = coordinator.sync("user1", &[local_event("local-1", "Dentist", 9)]).unwrap();
        let server_id = first.events[0].id.clone();

        // The client echoes back the server record it received.
        let report =
            coordinator.sync("user1", &[local_event(&server_id, "Dentist", 9)]).unwrap();

        assert_eq!(report.created, 0);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn synced_events_carry_their_local_id() {
        let store = create_test_store();
        let coordinator = SyncCoordinator::new(&store);

        let report = coordinator.sync("user1", &[local_event("local-1", "Dentist", 9)]).unwrap();

        assert_eq!(report.events[0].local_id.as_deref(), Some("local-1"));
    }

    #[test]
    fn events_land_on_the_default_calendar() {
        let store = create_test_store();
        let coordinator = SyncCoordinator::new(&store);

        let report = coordinator.sync("user1", &[local_event("local-1", "Dentist", 9)]).unwrap();

        let default_id = store.calendars_for_user("user1").unwrap()[0].id.clone();
        assert_eq!(report.events[0].calendar_id, default_id);
    }

    #[test]
    fn untitled_events_get_a_placeholder_title() {
        let store = create_test_store();
        let coordinator = SyncCoordinator::new(&store);

        let report = coordinator.sync("user1", &[local_event("local-1", "   ", 9)]).unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.events[0].title, "(untitled)");
    }

    #[test]
    fn a_bad_event_does_not_abort_the_batch() {
        let store = create_test_store();
        let coordinator = SyncCoordinator::new(&store);
        let mut inverted = local_event("local-bad", "Inverted", 10);
        inverted.end = inverted.start - chrono::Duration::hours(2);
        let batch = vec![
            local_event("local-1", "Dentist", 9),
            inverted,
            local_event("local-2", "Gym", 18),
        ];

        let report = coordinator.sync("user1", &batch).unwrap();

        assert_eq!(report.created, 2);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("Inverted"));
        assert_eq!(report.events.len(), 2);
    }

    #[test]
    fn returned_list_is_sorted_by_start() {
        let store = create_test_store();
        let coordinator = SyncCoordinator::new(&store);
        let batch =
            vec![local_event("local-2", "Late", 18), local_event("local-1", "Early", 8)];

        let report = coordinator.sync("user1", &batch).unwrap();

        assert_eq!(report.events[0].title, "Early");
        assert_eq!(report.events[1].title, "Late");
    }

    #[test]
    fn sync_never_updates_existing_server_events() {
        let store = create_test_store();
        let coordinator = SyncCoordinator::new(&store);
        coordinator.sync("user1", &[local_event("local-1", "Original", 9)]).unwrap();

        let mut renamed = local_event("local-1", "Renamed offline", 9);
        renamed.location = Some("Elsewhere".to_string());
        let report = coordinator.sync("user1", &[renamed]).unwrap();

        assert_eq!(report.created, 0);
        assert_eq!(report.events[0].title, "Original");
        assert_eq!(report.events[0].location, None);
    }
}
