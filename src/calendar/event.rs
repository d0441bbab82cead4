use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fallback color applied when a caller does not pick one.
pub const DEFAULT_COLOR: &str = "sky";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub user_id: String,
    pub calendar_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub color: String,
    pub location: Option<String>,
    /// Client-generated identifier preserved through sync so a second sync
    /// of the same offline event does not create a duplicate.
    pub local_id: Option<String>,
}

/// The caller-supplied portion of an event; ids and ownership are assigned
/// by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    pub color: Option<String>,
    pub location: Option<String>,
    pub local_id: Option<String>,
}

impl Event {
    pub fn from_draft(user_id: &str, calendar_id: &str, draft: EventDraft) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            calendar_id: calendar_id.to_string(),
            title: draft.title,
            description: draft.description,
            start: draft.start,
            end: draft.end,
            all_day: draft.all_day,
            color: draft.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            location: draft.location,
            local_id: draft.local_id,
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn overlaps(&self, other: &Event) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_event(id: &str, title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Event {
        Event {
            id: id.to_string(),
            user_id: "user1".to_string(),
            calendar_id: "cal1".to_string(),
            title: title.to_string(),
            description: None,
            start,
            end,
            all_day: false,
            color: DEFAULT_COLOR.to_string(),
            location: None,
            local_id: None,
        }
    }

    #[test]
    fn event_duration_calculated_correctly() {
        let start = Utc::now();
        let end = start + chrono::Duration::minutes(90);
        let event = create_test_event("test_id", "Meeting", start, end);

        assert_eq!(event.duration_minutes(), 90);
    }

    #[test]
    fn event_overlaps_with_another_event() {
        let start1 = Utc::now();
        let end1 = start1 + chrono::Duration::hours(2);
        let event1 = create_test_event("event1", "Event 1", start1, end1);

        let start2 = start1 + chrono::Duration::hours(1);
        let end2 = start2 + chrono::Duration::hours(1);
        let event2 = create_test_event("event2", "Event 2", start2, end2);

        assert!(event1.overlaps(&event2));
    }

    #[test]
    fn event_does_not_overlap_when_adjacent() {
        let start1 = Utc::now();
        let end1 = start1 + chrono::Duration::hours(1);
        let event1 = create_test_event("event1", "Event 1", start1, end1);

        let event2 =
            create_test_event("event2", "Event 2", end1, end1 + chrono::Duration::hours(1));

        assert!(!event1.overlaps(&event2));
    }

    #[test]
    fn draft_without_color_gets_default() {
        let start = Utc::now();
        let draft = EventDraft {
            title: "Meeting".to_string(),
            description: None,
            start,
            end: start + chrono::Duration::hours(1),
            all_day: false,
            color: None,
            location: None,
            local_id: None,
        };

        let event = Event::from_draft("user1", "cal1", draft);

        assert_eq!(event.color, DEFAULT_COLOR);
        assert_eq!(event.user_id, "user1");
        assert_eq!(event.calendar_id, "cal1");
    }

    #[test]
    fn draft_keeps_local_id_for_sync() {
        let start = Utc::now();
        let draft = EventDraft {
            title: "Offline event".to_string(),
            description: None,
            start,
            end: start + chrono::Duration::hours(1),
            all_day: false,
            color: None,
            location: None,
            local_id: Some("local-42".to_string()),
        };

        let event = Event::from_draft("user1", "cal1", draft);

        assert_eq!(event.local_id.as_deref(), Some("local-42"));
    }
}
