use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::business_days::BusinessCalendar;
use super::special_dates::{EmergencyDay, SpecialDates};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReceptionStatus {
    OnTime,
    WithPenalty,
    Future,
    EmergencyExtended,
}

impl fmt::Display for ReceptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReceptionStatus::OnTime => "on time (no penalty)",
            ReceptionStatus::WithPenalty => "out of term (with penalty)",
            ReceptionStatus::Future => "future-dated",
            ReceptionStatus::EmergencyExtended => "emergency extension (no penalty)",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyExtension {
    pub emergency_date: NaiveDate,
    pub extended_deadline: NaiveDate,
}

/// Classification of one document date against one reference date. Derived
/// fresh on each query, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusInfo {
    pub status: ReceptionStatus,
    pub business_days_elapsed: u32,
    pub cutoff_date: NaiveDate,
    pub emergency_extension: Option<EmergencyExtension>,
}

/// Combines the business-day engine with the emergency-day list to classify
/// document submissions.
#[derive(Debug, Clone)]
pub struct ReceptionResolver {
    calendar: BusinessCalendar,
    emergency_days: Vec<EmergencyDay>,
}

impl ReceptionResolver {
    pub fn new(special_dates: &SpecialDates) -> Self {
        Self {
            calendar: special_dates.business_calendar(),
            emergency_days: special_dates.emergency_days().to_vec(),
        }
    }

    pub fn calendar(&self) -> &BusinessCalendar {
        &self.calendar
    }

    /// First matching rule wins: future-dated documents are always flagged,
    /// then a still-open emergency extension, then the ordinary cutoff.
    pub fn resolve(&self, doc: NaiveDate, reference: NaiveDate) -> StatusInfo {
        let cutoff_date = self.calendar.cutoff_date(reference);

        if doc > reference {
            return StatusInfo {
                status: ReceptionStatus::Future,
                business_days_elapsed: 0,
                cutoff_date,
                emergency_extension: None,
            };
        }

        let business_days_elapsed = self.calendar.business_days_back(doc, reference);

        if let Some(extension) = self.applicable_emergency(doc, reference) {
            return StatusInfo {
                status: ReceptionStatus::EmergencyExtended,
                business_days_elapsed,
                cutoff_date,
                emergency_extension: Some(extension),
            };
        }

        let status = if doc >= cutoff_date {
            ReceptionStatus::OnTime
        } else {
            ReceptionStatus::WithPenalty
        };

        StatusInfo { status, business_days_elapsed, cutoff_date, emergency_extension: None }
    }

    /// An emergency applies when the document is dated exactly on it and its
    /// extended deadline has not passed the reference date yet. Duplicate
    /// emergency dates are rejected on input, so at most one entry can match.
    fn applicable_emergency(
        &self,
        doc: NaiveDate,
        reference: NaiveDate,
    ) -> Option<EmergencyExtension> {
        self.emergency_days.iter().find_map(|emergency| {
            if emergency.date != doc {
                return None;
            }
            let extended_deadline = self.calendar.emergency_deadline(emergency.date);
            (reference <= extended_deadline).then_some(EmergencyExtension {
                emergency_date: emergency.date,
                extended_deadline,
            })
        })
    }
}
