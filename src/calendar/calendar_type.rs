use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::DEFAULT_COLOR;

/// Name given to the calendar that is lazily created for a user with none.
pub const DEFAULT_CALENDAR_NAME: &str = "My calendar";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    /// Exactly one calendar per user carries this flag; it cannot be deleted.
    pub is_default: bool,
}

impl Calendar {
    pub fn new(user_id: &str, name: &str, description: Option<String>, color: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.trim().to_string(),
            description: description.map(|d| d.trim().to_string()),
            color: color.to_string(),
            is_default: false,
        }
    }

    /// The calendar created on first access for a user who has none yet.
    pub fn default_for(user_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: DEFAULT_CALENDAR_NAME.to_string(),
            description: None,
            color: DEFAULT_COLOR.to_string(),
            is_default: true,
        }
    }
}
