pub mod calendar_type;
pub mod event;
pub mod reservation;
pub mod share;
pub mod user;

pub use calendar_type::{Calendar, DEFAULT_CALENDAR_NAME};
pub use event::{DEFAULT_COLOR, Event, EventDraft};
pub use reservation::{Reservation, ReservationDraft};
pub use share::{
    AccessRole, CalendarRef, CalendarShare, SharePermission, ShareStatus, generate_share_token,
};
pub use user::User;
