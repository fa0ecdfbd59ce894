//! "Cancel today's watering" override.
//!
//! The override is a persisted `{active, date}` pair. It has no expiry: once
//! set it stays set until toggled again. The compiler only honours it on the
//! stored date, so a stale date suppresses nothing but still reads as
//! canceled.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CancellationOverride {
    pub active: bool,
    /// Only meaningful while `active` is true.
    pub date: Option<NaiveDate>,
}

/// View of the override as a two-state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "date", rename_all = "snake_case")]
pub enum OverrideState {
    Active,
    CanceledForDate(NaiveDate),
}

impl CancellationOverride {
    pub fn canceled_for(date: NaiveDate) -> Self {
        Self {
            active: true,
            date: Some(date),
        }
    }

    pub fn state(&self) -> OverrideState {
        match (self.active, self.date) {
            (true, Some(date)) => OverrideState::CanceledForDate(date),
            _ => OverrideState::Active,
        }
    }

    /// True when watering on `today` is canceled.
    pub fn is_canceled_on(&self, today: NaiveDate) -> bool {
        self.state() == OverrideState::CanceledForDate(today)
    }

    /// True when an entry on `day` must be left out of a compile pass run on `today`.
    pub fn suppresses(&self, day: Weekday, today: NaiveDate) -> bool {
        self.is_canceled_on(today) && today.weekday() == day
    }

    /// Next state after the operator presses the toggle on `today`.
    ///
    /// Only a cancellation for `today` is cleared; a stale one is moved to today.
    pub fn toggled(&self, today: NaiveDate) -> Self {
        if self.is_canceled_on(today) {
            Self::default()
        } else {
            Self::canceled_for(today)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn toggle_twice_same_day_returns_to_active() {
        let today = d(2024, 6, 3);
        let once = CancellationOverride::default().toggled(today);
        assert_eq!(once.state(), OverrideState::CanceledForDate(today));
        let twice = once.toggled(today);
        assert_eq!(twice.state(), OverrideState::Active);
        assert_eq!(twice.date, None);
        assert!(!twice.active);
    }

    #[test]
    fn stale_cancellation_is_moved_to_today() {
        let stale = CancellationOverride::canceled_for(d(2024, 6, 3));
        let today = d(2024, 6, 10);
        assert!(!stale.is_canceled_on(today));
        assert_eq!(stale.toggled(today), CancellationOverride::canceled_for(today));
    }

    #[test]
    fn stale_cancellation_persists_without_expiry() {
        let stale = CancellationOverride::canceled_for(d(2024, 6, 3));
        // No automatic reset: a week later the state still reads as canceled,
        // but it suppresses nothing because the date no longer matches.
        assert_eq!(stale.state(), OverrideState::CanceledForDate(d(2024, 6, 3)));
        assert!(!stale.suppresses(Weekday::Mon, d(2024, 6, 10)));
    }

    #[test]
    fn suppresses_only_matching_weekday() {
        // 2024-06-03 is a Monday.
        let today = d(2024, 6, 3);
        let ov = CancellationOverride::canceled_for(today);
        assert!(ov.suppresses(Weekday::Mon, today));
        assert!(!ov.suppresses(Weekday::Tue, today));
    }

    #[test]
    fn inactive_flag_with_date_reads_as_active() {
        let ov = CancellationOverride {
            active: false,
            date: Some(d(2024, 6, 3)),
        };
        assert_eq!(ov.state(), OverrideState::Active);
    }
}
