use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::DEFAULT_COLOR;

/// A booking of the single shared resource. Unlike events, reservations are
/// visible to every user and must not overlap system-wide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub color: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationDraft {
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    pub color: Option<String>,
    pub location: Option<String>,
}

impl Reservation {
    pub fn from_draft(user_id: &str, draft: ReservationDraft) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: draft.title,
            description: draft.description,
            start: draft.start,
            end: draft.end,
            all_day: draft.all_day,
            color: draft.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            location: draft.location,
        }
    }

    /// Half-open interval check: [start, end) ranges touching at an endpoint
    /// do not overlap.
    pub fn overlaps_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }
}
