use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::business_days::BusinessCalendar;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecialDatesError {
    #[error("a name is required")]
    EmptyName,
    #[error("a description is required")]
    EmptyDescription,
    #[error("an emergency day already exists on {0}")]
    DuplicateEmergency(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyDay {
    pub date: NaiveDate,
    pub description: String,
}

/// The client-owned exception lists the business-day engine consults.
/// Entries are immutable once added; mutation is add or remove-by-index.
/// Duplicate emergency dates are rejected so at most one extension can ever
/// apply to a document date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecialDates {
    holidays: Vec<Holiday>,
    emergency_days: Vec<EmergencyDay>,
}

impl SpecialDates {
    pub fn new(holidays: Vec<Holiday>, emergency_days: Vec<EmergencyDay>) -> Self {
        Self { holidays, emergency_days }
    }

    pub fn holidays(&self) -> &[Holiday] {
        &self.holidays
    }

    pub fn emergency_days(&self) -> &[EmergencyDay] {
        &self.emergency_days
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.iter().any(|h| h.date == date)
    }

    pub fn is_emergency_day(&self, date: NaiveDate) -> bool {
        self.emergency_days.iter().any(|e| e.date == date)
    }

    pub fn add_holiday(&mut self, date: NaiveDate, name: &str) -> Result<(), SpecialDatesError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SpecialDatesError::EmptyName);
        }
        self.holidays.push(Holiday { date, name: name.to_string() });
        Ok(())
    }

    /// Out-of-range indices are ignored, matching remove-by-filter semantics.
    pub fn remove_holiday(&mut self, index: usize) {
        if index < self.holidays.len() {
            self.holidays.remove(index);
        }
    }

    pub fn add_emergency(
        &mut self,
        date: NaiveDate,
        description: &str,
    ) -> Result<(), SpecialDatesError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(SpecialDatesError::EmptyDescription);
        }
        if self.is_emergency_day(date) {
            return Err(SpecialDatesError::DuplicateEmergency(date));
        }
        self.emergency_days.push(EmergencyDay { date, description: description.to_string() });
        Ok(())
    }

    pub fn remove_emergency(&mut self, index: usize) {
        if index < self.emergency_days.len() {
            self.emergency_days.remove(index);
        }
    }

    pub fn business_calendar(&self) -> BusinessCalendar {
        BusinessCalendar::new(self.holidays.iter().map(|h| h.date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn added_holiday_is_recognized() {
        let mut dates = SpecialDates::default();

        dates.add_holiday(date(2024, 12, 25), "Christmas").unwrap();

        assert!(dates.is_holiday(date(2024, 12, 25)));
        assert!(!dates.is_holiday(date(2024, 12, 24)));
    }

    #[test]
    fn holiday_without_name_is_rejected() {
        let mut dates = SpecialDates::default();

        let result = dates.add_holiday(date(2024, 12, 25), "   ");

        assert_eq!(result, Err(SpecialDatesError::EmptyName));
        assert!(dates.holidays().is_empty());
    }

    #[test]
    fn remove_holiday_by_index() {
        let mut dates = SpecialDates::default();
        dates.add_holiday(date(2024, 12, 25), "Christmas").unwrap();
        dates.add_holiday(date(2025, 1, 1), "New year").unwrap();

        dates.remove_holiday(0);

        assert_eq!(dates.holidays().len(), 1);
        assert_eq!(dates.holidays()[0].name, "New year");
    }

    #[test]
    fn remove_with_stale_index_is_a_no_op() {
        let mut dates = SpecialDates::default();
        dates.add_holiday(date(2024, 12, 25), "Christmas").unwrap();

        dates.remove_holiday(5);
        dates.remove_emergency(0);

        assert_eq!(dates.holidays().len(), 1);
    }

    #[test]
    fn duplicate_emergency_date_is_rejected() {
        let mut dates = SpecialDates::default();
        dates.add_emergency(date(2024, 3, 1), "Flooding").unwrap();

        let result = dates.add_emergency(date(2024, 3, 1), "Second incident");

        assert_eq!(result, Err(SpecialDatesError::DuplicateEmergency(date(2024, 3, 1))));
        assert_eq!(dates.emergency_days().len(), 1);
    }

    #[test]
    fn business_calendar_uses_holiday_dates() {
        let mut dates = SpecialDates::default();
        dates.add_holiday(date(2024, 3, 8), "Local holiday").unwrap();

        let calendar = dates.business_calendar();

        assert!(calendar.is_holiday(date(2024, 3, 8)));
    }
}
