//! Next-run calculation for report schedules.
//!
//! The rule: a schedule fires on `day_of_period` of each month at
//! `time_of_day` UTC. Days past the end of a short month clamp to the
//! month's last day rather than rolling into the next month. The computed
//! next run is always strictly in the future relative to `now`; in
//! particular, a schedule whose time has already passed today lands in the
//! next month, not today.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use shared::period::days_in_month;

use crate::models::TimeOfDay;

/// Compute the next run strictly after `now`.
///
/// `day_of_period` is expected in 1..=31 (validated at the boundary);
/// values above a month's length clamp to its last day.
pub fn next_run(day_of_period: u32, time_of_day: TimeOfDay, now: DateTime<Utc>) -> DateTime<Utc> {
    // Anchor on today at the scheduled time; once that instant has passed,
    // the occurrence belongs to the next month.
    let today_at_time = at_clamped_day(now.year(), now.month(), now.day(), time_of_day);
    let (mut year, mut month) = if today_at_time <= now {
        next_month(now.year(), now.month())
    } else {
        (now.year(), now.month())
    };

    let mut candidate = at_clamped_day(year, month, day_of_period, time_of_day);
    if candidate <= now {
        // The scheduled day of this month already went by.
        (year, month) = next_month(year, month);
        candidate = at_clamped_day(year, month, day_of_period, time_of_day);
    }
    candidate
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn at_clamped_day(year: i32, month: u32, day: u32, time: TimeOfDay) -> DateTime<Utc> {
    let day = day.clamp(1, days_in_month(year, month));
    // Valid by construction: day is within the month and time is validated.
    Utc.with_ymd_and_hms(year, month, day, time.hour, time.minute, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn tod(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    #[test]
    fn test_day_31_after_time_on_feb_15_lands_march_31() {
        let now = Utc.with_ymd_and_hms(2025, 2, 15, 3, 0, 0).unwrap();
        let next = next_run(31, tod("02:00"), now);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 31, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_advance_after_clamped_run_lands_next_month() {
        // Advancing right after the clamped Feb 28 run must not re-pick it.
        let now = Utc.with_ymd_and_hms(2025, 2, 28, 2, 0, 5).unwrap();
        let next = next_run(31, tod("02:00"), now);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 31, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_day_31_lands_in_april_clamps_to_30() {
        // Evaluated on March 31 after 02:00, the next occurrence is April.
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 3, 0, 0).unwrap();
        let next = next_run(31, tod("02:00"), now);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 4, 30, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_day_31_in_february_clamps_to_28() {
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let next = next_run(31, tod("02:00"), now);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 2, 28, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_leap_year_february_clamps_to_29() {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let next = next_run(30, tod("12:00"), now);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_time_already_passed_today_schedules_next_month() {
        // New schedule created after its time of day on its day of period.
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 9, 30, 0).unwrap();
        let next = next_run(10, tod("09:00"), now);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 7, 10, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_time_later_today_schedules_today() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 8, 0, 0).unwrap();
        let next = next_run(10, tod("09:00"), now);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_day_already_passed_this_month_schedules_next_month() {
        let now = Utc.with_ymd_and_hms(2025, 6, 20, 8, 0, 0).unwrap();
        let next = next_run(10, tod("09:00"), now);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 7, 10, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_december_rolls_into_january() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 23, 0, 0).unwrap();
        let next = next_run(31, tod("02:00"), now);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 31, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_always_future_with_clamped_day() {
        // Property sweep: every day-of-period and a spread of times against
        // a fixed clock must produce a strictly-future run on the clamped
        // day of month.
        let now = Utc.with_ymd_and_hms(2025, 2, 15, 13, 37, 0).unwrap();
        for day in 1..=31u32 {
            for time in ["00:00", "02:00", "13:37", "23:59"] {
                let next = next_run(day, tod(time), now);
                assert!(next > now, "day={day} time={time} produced {next}");
                let expected_day = day.min(days_in_month(next.year(), next.month()));
                assert_eq!(next.day(), expected_day, "day={day} time={time}");
                assert_eq!(next.second(), 0);
            }
        }
    }
}
