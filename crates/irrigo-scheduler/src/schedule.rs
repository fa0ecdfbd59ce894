use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use irrigo_core::ClockTime;

use crate::types::Trigger;

/// Next local wall-clock instant strictly *after* `from` that falls on
/// `day` at `at`.
pub fn next_occurrence(day: Weekday, at: ClockTime, from: NaiveDateTime) -> NaiveDateTime {
    // Both sides use ISO numbering: 0=Monday … 6=Sunday.
    let today_dow = from.weekday().num_days_from_monday() as i64;
    let target_dow = day.num_days_from_monday() as i64;
    let days_ahead = (target_dow - today_dow).rem_euclid(7);

    let time = NaiveTime::from_hms_opt(at.hour as u32, at.minute as u32, 0).unwrap_or_default();
    let candidate = (from.date() + Duration::days(days_ahead)).and_time(time);

    if candidate > from {
        candidate
    } else {
        // Same weekday, time already passed: next week.
        candidate + Duration::days(7)
    }
}

/// Whether `trigger` has an occurrence in the window `(last, now]`.
pub fn is_due(trigger: &Trigger, last: NaiveDateTime, now: NaiveDateTime) -> bool {
    next_occurrence(trigger.day, trigger.at, last) <= now
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn t(h: u8, m: u8) -> ClockTime {
        ClockTime::new(h, m).unwrap()
    }

    // 2024-06-03 is a Monday.

    #[test]
    fn later_the_same_day() {
        let next = next_occurrence(Weekday::Mon, t(7, 0), at(2024, 6, 3, 6, 0, 0));
        assert_eq!(next, at(2024, 6, 3, 7, 0, 0));
    }

    #[test]
    fn later_in_the_week() {
        let next = next_occurrence(Weekday::Thu, t(5, 30), at(2024, 6, 3, 6, 0, 0));
        assert_eq!(next, at(2024, 6, 6, 5, 30, 0));
    }

    #[test]
    fn earlier_weekday_wraps_to_next_week() {
        let next = next_occurrence(Weekday::Sun, t(5, 30), at(2024, 6, 4, 6, 0, 0));
        assert_eq!(next, at(2024, 6, 9, 5, 30, 0));
        let next = next_occurrence(Weekday::Mon, t(5, 30), at(2024, 6, 4, 6, 0, 0));
        assert_eq!(next, at(2024, 6, 10, 5, 30, 0));
    }

    #[test]
    fn exact_instant_is_not_its_own_successor() {
        let next = next_occurrence(Weekday::Mon, t(7, 0), at(2024, 6, 3, 7, 0, 0));
        assert_eq!(next, at(2024, 6, 10, 7, 0, 0));
    }

    #[test]
    fn due_window_is_half_open() {
        let trigger = Trigger {
            day: Weekday::Mon,
            at: t(7, 0),
            command: irrigo_core::Command::On,
            valves: vec![1],
            entry_index: 0,
        };
        assert!(is_due(&trigger, at(2024, 6, 3, 6, 59, 59), at(2024, 6, 3, 7, 0, 0)));
        assert!(!is_due(&trigger, at(2024, 6, 3, 7, 0, 0), at(2024, 6, 3, 7, 0, 1)));
        assert!(!is_due(&trigger, at(2024, 6, 3, 6, 59, 0), at(2024, 6, 3, 6, 59, 59)));
    }
}
