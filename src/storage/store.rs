use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use thiserror::Error;
use tracing::info;

use crate::calendar::{
    Calendar, CalendarShare, DEFAULT_COLOR, Event, EventDraft, Reservation, ReservationDraft,
    SharePermission, ShareStatus, User,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    InvalidInput(String),
    /// Covers both a genuinely absent record and one filtered out by an
    /// ownership predicate; callers cannot tell the two apart.
    #[error("not found")]
    NotFound,
    #[error("permission denied")]
    Forbidden,
    #[error("the time slot overlaps an existing reservation")]
    Overlap,
    #[error("the default calendar cannot be deleted")]
    DefaultCalendar,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS calendars (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    color TEXT NOT NULL,
    is_default INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_calendars_one_default
    ON calendars(user_id) WHERE is_default = 1;

CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    calendar_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    start_at TEXT NOT NULL,
    end_at TEXT NOT NULL,
    all_day INTEGER NOT NULL,
    color TEXT NOT NULL,
    location TEXT,
    local_id TEXT
);
CREATE INDEX IF NOT EXISTS idx_events_user_start ON events(user_id, start_at);
CREATE INDEX IF NOT EXISTS idx_events_calendar_start ON events(calendar_id, start_at);
CREATE INDEX IF NOT EXISTS idx_events_user_local ON events(user_id, local_id);

CREATE TABLE IF NOT EXISTS shares (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    calendar_id TEXT NOT NULL,
    shared_with_email TEXT NOT NULL,
    shared_with_id TEXT,
    permission TEXT NOT NULL,
    share_token TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL,
    calendar_name TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_shares_owner_calendar_email
    ON shares(owner_id, calendar_id, shared_with_email);

CREATE TABLE IF NOT EXISTS reservations (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    start_at TEXT NOT NULL,
    end_at TEXT NOT NULL,
    all_day INTEGER NOT NULL,
    color TEXT NOT NULL,
    location TEXT
);
CREATE INDEX IF NOT EXISTS idx_reservations_range ON reservations(start_at, end_at);
";

const EVENT_COLUMNS: &str =
    "id, user_id, calendar_id, title, description, start_at, end_at, all_day, color, \
     location, local_id";
const SHARE_COLUMNS: &str =
    "id, owner_id, calendar_id, shared_with_email, shared_with_id, permission, share_token, \
     status, calendar_name";
const RESERVATION_COLUMNS: &str =
    "id, user_id, title, description, start_at, end_at, all_day, color, location";

/// Server-side persistence for users, calendars, events, shares, and
/// reservations. All timestamps are stored as RFC 3339 text in UTC, which
/// keeps lexicographic comparison equal to chronological comparison.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self::new(Connection::open(path)?);
        store.migrate()?;
        Ok(store)
    }

    /// Creates the schema and applies one-time cleanups. Runs at startup,
    /// never on the request path.
    pub fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(SCHEMA)?;
        // An earlier schema keyed shares on (owner, email) only, which blocked
        // sharing two calendars with the same person.
        self.conn.execute("DROP INDEX IF EXISTS idx_shares_owner_email", [])?;
        Ok(())
    }

    pub fn table_exists(&self, table_name: &str) -> bool {
        let result: rusqlite::Result<i32> = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [table_name],
            |row| row.get(0),
        );
        result.unwrap_or(0) > 0
    }

    // --- users ---

    pub fn create_user(&self, user: &User) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO users (id, name, email) VALUES (?1, ?2, ?3)",
            params![user.id, user.name, user.email.to_lowercase()],
        )?;
        Ok(())
    }

    pub fn user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.conn
            .query_row("SELECT id, name, email FROM users WHERE id = ?1", [id], user_from_row)
            .optional()
            .map_err(StoreError::from)
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.conn
            .query_row(
                "SELECT id, name, email FROM users WHERE email = ?1",
                [email.trim().to_lowercase()],
                user_from_row,
            )
            .optional()
            .map_err(StoreError::from)
    }

    // --- calendars ---

    /// Lists the user's calendars, default first. A user seen for the first
    /// time gets a default calendar created on the spot.
    pub fn calendars_for_user(&self, user_id: &str) -> Result<Vec<Calendar>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, description, color, is_default FROM calendars
             WHERE user_id = ?1 ORDER BY is_default DESC, created_at ASC",
        )?;
        let calendars = stmt
            .query_map([user_id], calendar_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        if !calendars.is_empty() {
            return Ok(calendars);
        }

        let default = Calendar::default_for(user_id);
        self.insert_calendar(&default)?;
        info!(user_id, calendar_id = %default.id, "created default calendar");
        Ok(vec![default])
    }

    pub fn create_calendar(
        &self,
        user_id: &str,
        name: &str,
        description: Option<String>,
        color: Option<&str>,
    ) -> Result<Calendar, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidInput("a name is required".to_string()));
        }
        let calendar =
            Calendar::new(user_id, name, description, color.unwrap_or(DEFAULT_COLOR));
        self.insert_calendar(&calendar)?;
        Ok(calendar)
    }

    fn insert_calendar(&self, calendar: &Calendar) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO calendars (id, user_id, name, description, color, is_default, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                calendar.id,
                calendar.user_id,
                calendar.name,
                calendar.description,
                calendar.color,
                calendar.is_default,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn calendar_by_id(&self, user_id: &str, id: &str) -> Result<Option<Calendar>, StoreError> {
        self.conn
            .query_row(
                "SELECT id, user_id, name, description, color, is_default FROM calendars
                 WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                calendar_from_row,
            )
            .optional()
            .map_err(StoreError::from)
    }

    pub fn update_calendar(
        &self,
        user_id: &str,
        id: &str,
        name: Option<&str>,
        description: Option<String>,
        color: Option<&str>,
    ) -> Result<Calendar, StoreError> {
        let Some(mut calendar) = self.calendar_by_id(user_id, id)? else {
            return Err(StoreError::NotFound);
        };
        if let Some(name) = name {
            if name.trim().is_empty() {
                return Err(StoreError::InvalidInput("a name is required".to_string()));
            }
            calendar.name = name.trim().to_string();
        }
        if let Some(description) = description {
            calendar.description = Some(description.trim().to_string());
        }
        if let Some(color) = color {
            calendar.color = color.to_string();
        }
        self.conn.execute(
            "UPDATE calendars SET name = ?1, description = ?2, color = ?3 WHERE id = ?4",
            params![calendar.name, calendar.description, calendar.color, calendar.id],
        )?;
        Ok(calendar)
    }

    /// Deletes a calendar and everything on it. The default calendar is
    /// protected.
    pub fn delete_calendar(&mut self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let Some(calendar) = self.calendar_by_id(user_id, id)? else {
            return Err(StoreError::NotFound);
        };
        if calendar.is_default {
            return Err(StoreError::DefaultCalendar);
        }
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM events WHERE calendar_id = ?1", [id])?;
        tx.execute("DELETE FROM calendars WHERE id = ?1", [id])?;
        tx.commit()?;
        info!(user_id, calendar_id = id, "deleted calendar and its events");
        Ok(())
    }

    // --- events ---

    pub fn create_event(
        &self,
        user_id: &str,
        calendar_id: &str,
        draft: EventDraft,
    ) -> Result<Event, StoreError> {
        validate_title(&draft.title)?;
        validate_range(draft.start, draft.end)?;
        let event = Event::from_draft(user_id, calendar_id, draft);
        self.conn.execute(
            &format!("INSERT INTO events ({EVENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
            params![
                event.id,
                event.user_id,
                event.calendar_id,
                event.title,
                event.description,
                event.start.to_rfc3339(),
                event.end.to_rfc3339(),
                event.all_day,
                event.color,
                event.location,
                event.local_id,
            ],
        )?;
        Ok(event)
    }

    pub fn events_for_user(&self, user_id: &str) -> Result<Vec<Event>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE user_id = ?1 ORDER BY start_at ASC"
        ))?;
        let events =
            stmt.query_map([user_id], event_from_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    pub fn events_for_calendar(
        &self,
        owner_id: &str,
        calendar_id: &str,
    ) -> Result<Vec<Event>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE user_id = ?1 AND calendar_id = ?2 ORDER BY start_at ASC"
        ))?;
        let events = stmt
            .query_map(params![owner_id, calendar_id], event_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    pub fn update_event(
        &self,
        user_id: &str,
        event_id: &str,
        draft: EventDraft,
    ) -> Result<Event, StoreError> {
        validate_title(&draft.title)?;
        validate_range(draft.start, draft.end)?;
        let changed = self.conn.execute(
            "UPDATE events SET title = ?1, description = ?2, start_at = ?3, end_at = ?4,
                 all_day = ?5, color = ?6, location = ?7
             WHERE id = ?8 AND user_id = ?9",
            params![
                draft.title,
                draft.description,
                draft.start.to_rfc3339(),
                draft.end.to_rfc3339(),
                draft.all_day,
                draft.color.as_deref().unwrap_or(DEFAULT_COLOR),
                draft.location,
                event_id,
                user_id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        self.conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                [event_id],
                event_from_row,
            )
            .map_err(StoreError::from)
    }

    pub fn delete_event(&self, user_id: &str, event_id: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "DELETE FROM events WHERE id = ?1 AND user_id = ?2",
            params![event_id, user_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // --- shares ---

    pub fn insert_share(&self, share: &CalendarShare) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO shares ({SHARE_COLUMNS}, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                share.id,
                share.owner_id,
                share.calendar_id,
                share.shared_with_email,
                share.shared_with_id,
                share.permission.as_str(),
                share.share_token,
                share.status.as_str(),
                share.calendar_name,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn share_by_token(&self, token: &str) -> Result<Option<CalendarShare>, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {SHARE_COLUMNS} FROM shares WHERE share_token = ?1"),
                [token],
                share_from_row,
            )
            .optional()
            .map_err(StoreError::from)
    }

    pub fn find_share(
        &self,
        owner_id: &str,
        calendar_id: &str,
        email: &str,
    ) -> Result<Option<CalendarShare>, StoreError> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {SHARE_COLUMNS} FROM shares
                     WHERE owner_id = ?1 AND calendar_id = ?2 AND shared_with_email = ?3"
                ),
                params![owner_id, calendar_id, email.trim().to_lowercase()],
                share_from_row,
            )
            .optional()
            .map_err(StoreError::from)
    }

    pub fn shares_owned_by(
        &self,
        owner_id: &str,
        calendar_id: Option<&str>,
    ) -> Result<Vec<CalendarShare>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SHARE_COLUMNS} FROM shares
             WHERE owner_id = ?1 AND (?2 IS NULL OR calendar_id = ?2)
             ORDER BY created_at DESC"
        ))?;
        let shares = stmt
            .query_map(params![owner_id, calendar_id], share_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(shares)
    }

    /// Shares addressed to this user: already accepted by id, or still
    /// pending against their email.
    pub fn shares_addressed_to(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<Vec<CalendarShare>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SHARE_COLUMNS} FROM shares
             WHERE shared_with_id = ?1 OR (shared_with_email = ?2 AND status = 'pending')
             ORDER BY created_at DESC"
        ))?;
        let shares = stmt
            .query_map(params![user_id, email.trim().to_lowercase()], share_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(shares)
    }

    /// Idempotent: concurrent accepts write the same target values.
    pub fn accept_share(&self, token: &str, user_id: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE shares SET shared_with_id = ?1, status = 'accepted' WHERE share_token = ?2",
            params![user_id, token],
        )?;
        Ok(())
    }

    pub fn delete_share(&self, id: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute("DELETE FROM shares WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // --- reservations ---

    pub fn reservations(&self) -> Result<Vec<Reservation>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations ORDER BY start_at ASC"
        ))?;
        let reservations =
            stmt.query_map([], reservation_from_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reservations)
    }

    /// The overlap check and the insert run inside one immediate transaction,
    /// so two requests racing for the same slot serialize at the storage
    /// layer instead of both passing the check.
    pub fn create_reservation(
        &mut self,
        user_id: &str,
        draft: ReservationDraft,
    ) -> Result<Reservation, StoreError> {
        validate_title(&draft.title)?;
        validate_reservation_range(draft.start, draft.end)?;
        let reservation = Reservation::from_draft(user_id, draft);
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if overlap_exists(&tx, reservation.start, reservation.end, None)? {
            return Err(StoreError::Overlap);
        }
        tx.execute(
            &format!(
                "INSERT INTO reservations ({RESERVATION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                reservation.id,
                reservation.user_id,
                reservation.title,
                reservation.description,
                reservation.start.to_rfc3339(),
                reservation.end.to_rfc3339(),
                reservation.all_day,
                reservation.color,
                reservation.location,
            ],
        )?;
        tx.commit()?;
        Ok(reservation)
    }

    pub fn update_reservation(
        &mut self,
        user_id: &str,
        id: &str,
        draft: ReservationDraft,
    ) -> Result<Reservation, StoreError> {
        validate_title(&draft.title)?;
        validate_reservation_range(draft.start, draft.end)?;
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let owner: Option<String> = tx
            .query_row("SELECT user_id FROM reservations WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        match owner {
            None => return Err(StoreError::NotFound),
            Some(owner) if owner != user_id => return Err(StoreError::Forbidden),
            Some(_) => {}
        }
        if overlap_exists(&tx, draft.start, draft.end, Some(id))? {
            return Err(StoreError::Overlap);
        }
        tx.execute(
            "UPDATE reservations SET title = ?1, description = ?2, start_at = ?3, end_at = ?4,
                 all_day = ?5, color = ?6, location = ?7
             WHERE id = ?8",
            params![
                draft.title,
                draft.description,
                draft.start.to_rfc3339(),
                draft.end.to_rfc3339(),
                draft.all_day,
                draft.color.as_deref().unwrap_or(DEFAULT_COLOR),
                draft.location,
                id,
            ],
        )?;
        let updated = tx.query_row(
            &format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = ?1"),
            [id],
            reservation_from_row,
        )?;
        tx.commit()?;
        Ok(updated)
    }

    pub fn delete_reservation(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let owner: Option<String> = self
            .conn
            .query_row("SELECT user_id FROM reservations WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        match owner {
            None => Err(StoreError::NotFound),
            Some(owner) if owner != user_id => Err(StoreError::Forbidden),
            Some(_) => {
                self.conn.execute("DELETE FROM reservations WHERE id = ?1", [id])?;
                Ok(())
            }
        }
    }
}

fn validate_title(title: &str) -> Result<(), StoreError> {
    if title.trim().is_empty() {
        return Err(StoreError::InvalidInput("a title is required".to_string()));
    }
    Ok(())
}

fn validate_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), StoreError> {
    if end < start {
        return Err(StoreError::InvalidInput("end must not precede start".to_string()));
    }
    Ok(())
}

fn validate_reservation_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), StoreError> {
    if end <= start {
        return Err(StoreError::InvalidInput("end must be after start".to_string()));
    }
    Ok(())
}

fn overlap_exists(
    conn: &Connection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_id: Option<&str>,
) -> Result<bool, StoreError> {
    let overlapping: bool = conn.query_row(
        "SELECT EXISTS(
             SELECT 1 FROM reservations
             WHERE start_at < ?1 AND end_at > ?2 AND (?3 IS NULL OR id != ?3)
         )",
        params![end.to_rfc3339(), start.to_rfc3339(), exclude_id],
        |row| row.get(0),
    )?;
    Ok(overlapping)
}

fn ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User { id: row.get(0)?, name: row.get(1)?, email: row.get(2)? })
}

fn calendar_from_row(row: &Row<'_>) -> rusqlite::Result<Calendar> {
    Ok(Calendar {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
        is_default: row.get(5)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        user_id: row.get(1)?,
        calendar_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        start: ts(row, 5)?,
        end: ts(row, 6)?,
        all_day: row.get(7)?,
        color: row.get(8)?,
        location: row.get(9)?,
        local_id: row.get(10)?,
    })
}

fn share_permission(row: &Row<'_>, idx: usize) -> rusqlite::Result<SharePermission> {
    let text: String = row.get(idx)?;
    match text.as_str() {
        "read" => Ok(SharePermission::Read),
        "write" => Ok(SharePermission::Write),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown permission '{other}'").into(),
        )),
    }
}

fn share_status(row: &Row<'_>, idx: usize) -> rusqlite::Result<ShareStatus> {
    let text: String = row.get(idx)?;
    match text.as_str() {
        "pending" => Ok(ShareStatus::Pending),
        "accepted" => Ok(ShareStatus::Accepted),
        "rejected" => Ok(ShareStatus::Rejected),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown share status '{other}'").into(),
        )),
    }
}

fn share_from_row(row: &Row<'_>) -> rusqlite::Result<CalendarShare> {
    Ok(CalendarShare {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        calendar_id: row.get(2)?,
        shared_with_email: row.get(3)?,
        shared_with_id: row.get(4)?,
        permission: share_permission(row, 5)?,
        share_token: row.get(6)?,
        status: share_status(row, 7)?,
        calendar_name: row.get(8)?,
    })
}

fn reservation_from_row(row: &Row<'_>) -> rusqlite::Result<Reservation> {
    Ok(Reservation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        start: ts(row, 4)?,
        end: ts(row, 5)?,
        all_day: row.get(6)?,
        color: row.get(7)?,
        location: row.get(8)?,
    })
}
