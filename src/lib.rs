pub mod access;
pub mod app;
pub mod calendar;
pub mod schedule;
pub mod storage;
pub mod sync;

pub use app::{AppState, SyncStatus};
pub use calendar::{Calendar, CalendarRef, CalendarShare, Event, Reservation, User};
pub use schedule::{BusinessCalendar, ReceptionResolver, ReceptionStatus, SpecialDates, StatusInfo};

pub use access::{AccessError, AccessGrant, AccessService};
pub use sync::{SyncCoordinator, SyncReport};
