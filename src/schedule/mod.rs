pub mod business_days;
pub mod reception;
pub mod special_dates;

pub use business_days::{BusinessCalendar, CUTOFF_BUSINESS_DAYS, EMERGENCY_EXTENSION_DAYS};
pub use reception::{EmergencyExtension, ReceptionResolver, ReceptionStatus, StatusInfo};
pub use special_dates::{EmergencyDay, Holiday, SpecialDates, SpecialDatesError};
