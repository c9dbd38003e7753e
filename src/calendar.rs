//! Relative calendar math.
//!
//! Week numbering is personal: week 1 starts on the user's anchor date (first
//! login, else account creation, else "today" at call time). All functions
//! take the current date as a parameter so callers control the clock.

use chrono::{Duration, NaiveDate};

/// Resolve the start-of-tracking date for a user.
pub fn anchor_from(
    first_login: Option<NaiveDate>,
    created_at: Option<NaiveDate>,
    today: NaiveDate,
) -> NaiveDate {
    first_login.or(created_at).unwrap_or(today)
}

/// Relative week number of `date` counted from `anchor`:
/// `floor(days_between / 7) + 1`, never below 1.
///
/// A date before the anchor should not occur in normal operation; it is
/// clamped to week 1 but logged so a miscomputed anchor is visible.
pub fn week_number_of(anchor: NaiveDate, date: NaiveDate) -> i32 {
    let days = (date - anchor).num_days();
    if days < 0 {
        tracing::warn!(%anchor, %date, "date precedes anchor, clamping to week 1");
        return 1;
    }
    (days / 7) as i32 + 1
}

/// The 7-day date range of a week number. Week numbers below 1 clamp to 1.
pub fn range_of_week(anchor: NaiveDate, week_number: i32) -> (NaiveDate, NaiveDate) {
    let week = week_number.max(1);
    let start = anchor + Duration::days((week as i64 - 1) * 7);
    let end = start + Duration::days(6);
    (start, end)
}

/// Uppercase weekday name, e.g. "MONDAY". Informational only.
pub fn day_name(date: NaiveDate) -> String {
    date.format("%A").to_string().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn anchor_prefers_first_login() {
        let today = d("2024-03-15");
        assert_eq!(
            anchor_from(Some(d("2024-01-01")), Some(d("2023-12-25")), today),
            d("2024-01-01")
        );
        assert_eq!(
            anchor_from(None, Some(d("2023-12-25")), today),
            d("2023-12-25")
        );
        assert_eq!(anchor_from(None, None, today), today);
    }

    #[test]
    fn anchor_date_is_week_one() {
        let anchor = d("2024-01-01");
        assert_eq!(week_number_of(anchor, anchor), 1);
        assert_eq!(week_number_of(anchor, d("2024-01-07")), 1);
        assert_eq!(week_number_of(anchor, d("2024-01-08")), 2);
        assert_eq!(week_number_of(anchor, d("2024-02-05")), 6);
    }

    #[test]
    fn date_before_anchor_clamps_to_week_one() {
        assert_eq!(week_number_of(d("2024-01-01"), d("2023-12-31")), 1);
    }

    #[test]
    fn range_of_week_is_seven_days() {
        let anchor = d("2024-01-01");
        assert_eq!(range_of_week(anchor, 1), (d("2024-01-01"), d("2024-01-07")));
        assert_eq!(range_of_week(anchor, 3), (d("2024-01-15"), d("2024-01-21")));
    }

    #[test]
    fn range_of_week_clamps_below_one() {
        let anchor = d("2024-01-01");
        assert_eq!(range_of_week(anchor, 0), range_of_week(anchor, 1));
        assert_eq!(range_of_week(anchor, -3), range_of_week(anchor, 1));
    }

    #[test]
    fn range_contains_its_own_date() {
        let anchor = d("2024-01-01");
        for offset in 0..30 {
            let date = anchor + Duration::days(offset);
            let week = week_number_of(anchor, date);
            assert!(week >= 1);
            let (start, end) = range_of_week(anchor, week);
            assert!(start <= date && date <= end, "week range must contain {date}");
        }
    }

    #[test]
    fn day_name_is_uppercase_weekday() {
        // 2024-01-01 is a Monday
        assert_eq!(day_name(d("2024-01-01")), "MONDAY");
        assert_eq!(day_name(d("2024-01-07")), "SUNDAY");
    }
}
