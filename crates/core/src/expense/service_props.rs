//! Property tests for filter normalization.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use super::types::{ExpenseFilter, end_of_day, start_of_day};

/// Strategy for generating valid calendar dates.
fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

/// Strategy for generating times of day in whole seconds.
fn time_strategy() -> impl Strategy<Value = (u32, u32, u32)> {
    (0u32..24, 0u32..60, 0u32..60)
}

proptest! {
    /// The day bounds span exactly one day minus one second, starting at
    /// midnight.
    #[test]
    fn day_bounds_cover_one_whole_day(date in date_strategy()) {
        let from = start_of_day(date);
        let to = end_of_day(date);

        prop_assert_eq!(from.date(), date);
        prop_assert_eq!(to.date(), date);
        prop_assert_eq!(to - from, Duration::seconds(86_399));
    }

    /// An expense timestamped any time of day on the end date falls inside
    /// the inclusive upper bound.
    #[test]
    fn any_time_on_end_date_is_within_bounds(
        date in date_strategy(),
        (h, m, s) in time_strategy(),
    ) {
        let ts = date.and_hms_opt(h, m, s).unwrap();
        let filter = ExpenseFilter {
            start_date: Some(date),
            end_date: Some(date),
            ..ExpenseFilter::default()
        };
        let query = filter.normalize();

        prop_assert!(query.from.unwrap() <= ts);
        prop_assert!(ts <= query.to.unwrap());
    }

    /// The instant after the end bound belongs to the next day.
    #[test]
    fn bound_excludes_the_next_day(date in date_strategy()) {
        let next_midnight = end_of_day(date) + Duration::seconds(1);
        prop_assert_eq!(next_midnight, start_of_day(date + Duration::days(1)));
    }

    /// Only the exact `"all"` sentinel is dropped; every other value is a
    /// real filter and survives normalization.
    #[test]
    fn non_sentinel_filters_survive(value in "[a-z]{1,12}") {
        let filter = ExpenseFilter {
            user: Some(value.clone()),
            category: Some(value.clone()),
            ..ExpenseFilter::default()
        };
        let query = filter.normalize();

        if value == "all" {
            prop_assert!(query.member.is_none());
            prop_assert!(query.category.is_none());
        } else {
            prop_assert_eq!(query.member.as_deref(), Some(value.as_str()));
            prop_assert_eq!(query.category.as_deref(), Some(value.as_str()));
        }
    }

    /// Absent dates stay unbounded on their side.
    #[test]
    fn absent_dates_stay_unbounded(date in date_strategy()) {
        let lower_only = ExpenseFilter {
            start_date: Some(date),
            ..ExpenseFilter::default()
        }
        .normalize();
        prop_assert!(lower_only.from.is_some());
        prop_assert!(lower_only.to.is_none());

        let upper_only = ExpenseFilter {
            end_date: Some(date),
            ..ExpenseFilter::default()
        }
        .normalize();
        prop_assert!(upper_only.from.is_none());
        prop_assert!(upper_only.to.is_some());
    }
}
