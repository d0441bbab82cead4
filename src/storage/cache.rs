use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use crate::calendar::Event;
use crate::schedule::{EmergencyDay, Holiday, SpecialDates};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

const KEY_HOLIDAYS: &str = "holidays";
const KEY_EMERGENCIES: &str = "emergency_days";
const KEY_LAST_SYNCED: &str = "last_synced_at";

/// Offline store surviving restarts: the cached event list, the special-date
/// lists for the reception calculator, and the last successful sync time.
/// The sync coordinator only ever sees `load`/`save`, so it stays independent
/// of the storage mechanism.
pub struct EventCache {
    conn: Connection,
}

impl EventCache {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let cache = Self::new(Connection::open(path)?);
        cache.initialize()?;
        Ok(cache)
    }

    pub fn initialize(&self) -> Result<(), CacheError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                start_at TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    pub fn load_events(&self) -> Result<Vec<Event>, CacheError> {
        let mut stmt = self.conn.prepare("SELECT data FROM events ORDER BY start_at ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut events = Vec::new();
        for row in rows {
            let data = row?;
            events.push(serde_json::from_str(&data)?);
        }
        Ok(events)
    }

    /// Replaces the cached list wholesale; the server copy is authoritative
    /// after every sync, so partial merges are never attempted here.
    pub fn save_events(&mut self, events: &[Event]) -> Result<(), CacheError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM events", [])?;
        for event in events {
            let data = serde_json::to_string(event)?;
            tx.execute(
                "INSERT INTO events (id, data, start_at) VALUES (?1, ?2, ?3)",
                params![event.id, data, event.start.to_rfc3339()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_special_dates(&self) -> Result<SpecialDates, CacheError> {
        let holidays: Vec<Holiday> = match self.meta_value(KEY_HOLIDAYS)? {
            Some(data) => serde_json::from_str(&data)?,
            None => Vec::new(),
        };
        let emergency_days: Vec<EmergencyDay> = match self.meta_value(KEY_EMERGENCIES)? {
            Some(data) => serde_json::from_str(&data)?,
            None => Vec::new(),
        };
        Ok(SpecialDates::new(holidays, emergency_days))
    }

    pub fn save_special_dates(&self, dates: &SpecialDates) -> Result<(), CacheError> {
        self.set_meta_value(KEY_HOLIDAYS, &serde_json::to_string(dates.holidays())?)?;
        self.set_meta_value(KEY_EMERGENCIES, &serde_json::to_string(dates.emergency_days())?)?;
        Ok(())
    }

    pub fn last_synced_at(&self) -> Result<Option<DateTime<Utc>>, CacheError> {
        let Some(text) = self.meta_value(KEY_LAST_SYNCED)? else {
            return Ok(None);
        };
        Ok(DateTime::parse_from_rfc3339(&text).ok().map(|dt| dt.with_timezone(&Utc)))
    }

    pub fn set_last_synced_at(&self, at: DateTime<Utc>) -> Result<(), CacheError> {
        self.set_meta_value(KEY_LAST_SYNCED, &at.to_rfc3339())
    }

    pub fn table_exists(&self, table_name: &str) -> bool {
        let result: rusqlite::Result<i32> = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [table_name],
            |row| row.get(0),
        );
        result.unwrap_or(0) > 0
    }

    fn meta_value(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .map_err(CacheError::from)
    }

    fn set_meta_value(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn create_test_cache() -> EventCache {
        let conn = Connection::open_in_memory().unwrap();
        let cache = EventCache::new(conn);
        cache.initialize().unwrap();
        cache
    }

    fn create_test_event(id: &str, title: &str) -> Event {
        let start = Utc::now();
        Event {
            id: id.to_string(),
            user_id: "user1".to_string(),
            calendar_id: "cal1".to_string(),
            title: title.to_string(),
            description: None,
            start,
            end: start + chrono::Duration::hours(1),
            all_day: false,
            color: "sky".to_string(),
            location: None,
            local_id: None,
        }
    }

    #[test]
    fn creates_database_schema() {
        let conn = Connection::open_in_memory().unwrap();
        let cache = EventCache::new(conn);

        cache.initialize().unwrap();

        assert!(cache.table_exists("events"));
        assert!(cache.table_exists("meta"));
    }

    #[test]
    fn save_replaces_the_event_list_wholesale() {
        let mut cache = create_test_cache();
        cache.save_events(&[create_test_event("event1", "Old")]).unwrap();

        cache
            .save_events(&[create_test_event("event2", "New"), create_test_event("event3", "Also new")])
            .unwrap();

        let loaded = cache.load_events().unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().all(|e| e.id != "event1"));
    }

    #[test]
    fn empty_cache_loads_no_events() {
        let cache = create_test_cache();

        assert_eq!(cache.load_events().unwrap(), Vec::new());
    }

    #[test]
    fn special_dates_round_trip() {
        let cache = create_test_cache();
        let mut dates = SpecialDates::default();
        dates
            .add_holiday(NaiveDate::from_ymd_opt(2024, 12, 25).unwrap(), "Christmas")
            .unwrap();
        dates
            .add_emergency(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), "Flooding")
            .unwrap();

        cache.save_special_dates(&dates).unwrap();

        let loaded = cache.load_special_dates().unwrap();
        assert_eq!(loaded, dates);
    }

    #[test]
    fn missing_special_dates_load_empty() {
        let cache = create_test_cache();

        let loaded = cache.load_special_dates().unwrap();

        assert!(loaded.holidays().is_empty());
        assert!(loaded.emergency_days().is_empty());
    }

    #[test]
    fn last_synced_round_trip() {
        let cache = create_test_cache();
        assert_eq!(cache.last_synced_at().unwrap(), None);

        let now = Utc::now();
        cache.set_last_synced_at(now).unwrap();

        let loaded = cache.last_synced_at().unwrap().unwrap();
        assert_eq!(loaded.timestamp(), now.timestamp());
    }
}
