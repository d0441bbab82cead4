use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};

/// Business days that must pass after the reference date's cutoff walk.
pub const CUTOFF_BUSINESS_DAYS: u32 = 2;

/// Business days an emergency day adds to the on-time deadline.
pub const EMERGENCY_EXTENSION_DAYS: u32 = 5;

/// Pure business-day arithmetic over a configured holiday set. Weekends are
/// Saturday and Sunday; every comparison happens at day granularity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusinessCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl BusinessCalendar {
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self { holidays: holidays.into_iter().collect() }
    }

    pub fn is_weekend(date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    pub fn is_non_business_day(&self, date: NaiveDate) -> bool {
        Self::is_weekend(date) || self.is_holiday(date)
    }

    /// Walk backward from `from`, one calendar day at a time, until exactly
    /// `CUTOFF_BUSINESS_DAYS` business days have been consumed. Documents
    /// dated on or after the returned day are on time.
    pub fn cutoff_date(&self, from: NaiveDate) -> NaiveDate {
        let mut current = from;
        let mut count = 0;
        while count < CUTOFF_BUSINESS_DAYS {
            current = match current.pred_opt() {
                Some(day) => day,
                None => return current,
            };
            if !self.is_non_business_day(current) {
                count += 1;
            }
        }
        current
    }

    /// Business days strictly after `doc` up to and including `from`.
    /// Zero when `doc >= from`.
    pub fn business_days_back(&self, doc: NaiveDate, from: NaiveDate) -> u32 {
        let mut current = doc;
        let mut count = 0;
        while current < from {
            current = match current.succ_opt() {
                Some(day) => day,
                None => return count,
            };
            if !self.is_non_business_day(current) {
                count += 1;
            }
        }
        count
    }

    /// Walk forward from `emergency` until exactly
    /// `EMERGENCY_EXTENSION_DAYS` business days have been consumed.
    pub fn emergency_deadline(&self, emergency: NaiveDate) -> NaiveDate {
        let mut current = emergency;
        let mut count = 0;
        while count < EMERGENCY_EXTENSION_DAYS {
            current = match current.succ_opt() {
                Some(day) => day,
                None => return current,
            };
            if !self.is_non_business_day(current) {
                count += 1;
            }
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekends_are_non_business_days() {
        let calendar = BusinessCalendar::default();

        assert!(calendar.is_non_business_day(date(2024, 3, 2))); // Saturday
        assert!(calendar.is_non_business_day(date(2024, 3, 3))); // Sunday
        assert!(!calendar.is_non_business_day(date(2024, 3, 4))); // Monday
    }

    #[test]
    fn holidays_are_non_business_days() {
        let calendar = BusinessCalendar::new([date(2024, 3, 8)]);

        assert!(calendar.is_non_business_day(date(2024, 3, 8))); // Friday, but a holiday
        assert!(!calendar.is_non_business_day(date(2024, 3, 7)));
    }

    #[test]
    fn cutoff_skips_a_weekend() {
        let calendar = BusinessCalendar::default();

        // Monday 2024-03-11: back over Sun/Sat to Fri (1), Thu (2).
        assert_eq!(calendar.cutoff_date(date(2024, 3, 11)), date(2024, 3, 7));
    }

    #[test]
    fn cutoff_skips_holidays_too() {
        let calendar = BusinessCalendar::new([date(2024, 3, 8)]);

        // Monday 2024-03-11: Sun/Sat skipped, Fri is a holiday, Thu (1), Wed (2).
        assert_eq!(calendar.cutoff_date(date(2024, 3, 11)), date(2024, 3, 6));
    }

    #[test]
    fn cutoff_midweek_is_two_days_back() {
        let calendar = BusinessCalendar::default();

        assert_eq!(calendar.cutoff_date(date(2024, 3, 7)), date(2024, 3, 5));
    }

    #[test]
    fn business_days_back_is_zero_for_same_day() {
        let calendar = BusinessCalendar::default();

        assert_eq!(calendar.business_days_back(date(2024, 3, 7), date(2024, 3, 7)), 0);
    }

    #[test]
    fn business_days_back_is_zero_when_doc_is_later() {
        let calendar = BusinessCalendar::default();

        assert_eq!(calendar.business_days_back(date(2024, 3, 8), date(2024, 3, 7)), 0);
    }

    #[test]
    fn business_days_back_counts_over_a_weekend() {
        let calendar = BusinessCalendar::default();

        // Friday -> Monday: only Monday counts.
        assert_eq!(calendar.business_days_back(date(2024, 3, 1), date(2024, 3, 4)), 1);
    }

    #[test]
    fn emergency_deadline_spans_one_weekend() {
        let calendar = BusinessCalendar::default();

        // Friday 2024-03-01 + 5 business days = Friday 2024-03-08.
        assert_eq!(calendar.emergency_deadline(date(2024, 3, 1)), date(2024, 3, 8));
    }

    #[test]
    fn emergency_deadline_stretches_over_holidays() {
        let calendar = BusinessCalendar::new([date(2024, 3, 4), date(2024, 3, 5)]);

        // Mon/Tue are holidays, so the fifth business day lands on the next Tuesday.
        assert_eq!(calendar.emergency_deadline(date(2024, 3, 1)), date(2024, 3, 12));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_date() -> impl Strategy<Value = NaiveDate> {
            (0u64..3000).prop_map(|offset| {
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Days::new(offset)
            })
        }

        fn arb_calendar() -> impl Strategy<Value = BusinessCalendar> {
            proptest::collection::vec(arb_date(), 0..12).prop_map(BusinessCalendar::new)
        }

        proptest! {
            #[test]
            fn cutoff_is_a_business_day_strictly_before(
                reference in arb_date(),
                calendar in arb_calendar(),
            ) {
                let cutoff = calendar.cutoff_date(reference);
                prop_assert!(cutoff < reference);
                prop_assert!(!calendar.is_non_business_day(cutoff));
            }

            #[test]
            fn deadline_is_exactly_five_business_days_out(
                emergency in arb_date(),
                calendar in arb_calendar(),
            ) {
                let deadline = calendar.emergency_deadline(emergency);
                prop_assert!(!calendar.is_non_business_day(deadline));
                prop_assert_eq!(
                    calendar.business_days_back(emergency, deadline),
                    EMERGENCY_EXTENSION_DAYS
                );
            }

            #[test]
            fn count_grows_with_the_gap(
                doc in arb_date(),
                gap in 0u64..60,
                extra in 1u64..30,
                calendar in arb_calendar(),
            ) {
                let near = doc + chrono::Days::new(gap);
                let far = near + chrono::Days::new(extra);
                prop_assert!(
                    calendar.business_days_back(doc, near)
                        <= calendar.business_days_back(doc, far)
                );
            }
        }
    }
}
