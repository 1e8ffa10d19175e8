use chrono::{Days, NaiveDate};

use crate::error::StatsError;
use crate::models::{Category, CategorySummary, DailyRecord, RollingAverages};

pub const SHORT_WINDOW_DAYS: u64 = 10;
pub const LONG_WINDOW_DAYS: u64 = 30;

fn mean<'a>(category: &str, records: impl Iterator<Item = &'a DailyRecord>) -> f64 {
    let (total, count) = records.fold((0i64, 0usize), |(total, count), record| {
        (total + i64::from(record.rating(category)), count + 1)
    });

    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

/// Mean rating for `category` across every record. Empty input yields `0.0`.
pub fn all_time_average(category: &str, records: &[DailyRecord]) -> f64 {
    mean(category, records.iter())
}

/// First day of a trailing window ending on `as_of`, clamped to the
/// earliest representable date.
pub fn window_start(window_days: u64, as_of: NaiveDate) -> NaiveDate {
    as_of
        .checked_sub_days(Days::new(window_days))
        .unwrap_or(NaiveDate::MIN)
}

fn windowed_mean(
    category: &str,
    records: &[DailyRecord],
    window_days: u64,
    as_of: NaiveDate,
) -> f64 {
    let start = window_start(window_days, as_of);
    mean(
        category,
        records
            .iter()
            .filter(|record| record.date >= start && record.date <= as_of),
    )
}

/// Mean rating for `category` over records dated in
/// `[as_of - window_days, as_of]`, both ends inclusive.
pub fn trailing_average(
    category: &str,
    records: &[DailyRecord],
    window_days: i64,
    as_of: NaiveDate,
) -> Result<f64, StatsError> {
    let window_days =
        u64::try_from(window_days).map_err(|_| StatsError::InvalidWindow(window_days))?;
    Ok(windowed_mean(category, records, window_days, as_of))
}

fn averages_for(category: &str, records: &[DailyRecord], as_of: NaiveDate) -> RollingAverages {
    RollingAverages {
        all_time: all_time_average(category, records),
        trailing_10: windowed_mean(category, records, SHORT_WINDOW_DAYS, as_of),
        trailing_30: windowed_mean(category, records, LONG_WINDOW_DAYS, as_of),
    }
}

/// One summary per category, in the order supplied.
pub fn summarize(
    categories: &[Category],
    records: &[DailyRecord],
    as_of: NaiveDate,
) -> Vec<CategorySummary> {
    categories
        .iter()
        .map(|category| CategorySummary {
            identifier: category.identifier.clone(),
            averages: averages_for(&category.identifier, records, as_of),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn reference_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 30).unwrap()
    }

    fn record(days_ago: i64, category: &str, value: i32) -> DailyRecord {
        DailyRecord::new(reference_day() - Duration::days(days_ago)).with_rating(category, value)
    }

    #[test]
    fn empty_records_average_to_zero() {
        assert_eq!(all_time_average("health", &[]), 0.0);
        assert_eq!(trailing_average("health", &[], 10, reference_day()), Ok(0.0));
        assert_eq!(trailing_average("health", &[], 0, reference_day()), Ok(0.0));
    }

    #[test]
    fn opposite_ratings_cancel_out() {
        let records = vec![record(0, "health", 2), record(1, "health", -2)];
        assert_eq!(all_time_average("health", &records), 0.0);
    }

    #[test]
    fn trailing_window_ignores_older_records() {
        let records = vec![record(15, "work", 2), record(5, "work", -2)];
        assert_eq!(
            trailing_average("work", &records, 10, reference_day()),
            Ok(-2.0)
        );
        assert_eq!(all_time_average("work", &records), 0.0);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let records = vec![record(10, "growth", 2), record(0, "growth", 1)];
        assert_eq!(
            trailing_average("growth", &records, 10, reference_day()),
            Ok(1.5)
        );
        assert_eq!(
            trailing_average("growth", &records, 9, reference_day()),
            Ok(1.0)
        );
    }

    #[test]
    fn future_records_are_outside_the_window() {
        let records = vec![record(-1, "family", 2), record(2, "family", -1)];
        assert_eq!(
            trailing_average("family", &records, 30, reference_day()),
            Ok(-1.0)
        );
    }

    #[test]
    fn duplicate_days_are_all_counted() {
        let records = vec![
            record(3, "health", 2),
            record(3, "health", 1),
            record(3, "health", 0),
        ];
        assert_eq!(all_time_average("health", &records), 1.0);
        assert_eq!(
            trailing_average("health", &records, 10, reference_day()),
            Ok(1.0)
        );
    }

    #[test]
    fn missing_rating_counts_as_zero() {
        let records = vec![record(1, "health", 2), record(2, "work", 2)];
        assert_eq!(all_time_average("health", &records), 1.0);
    }

    #[test]
    fn legacy_fields_feed_the_average() {
        let mut legacy = DailyRecord::new(reference_day());
        legacy.legacy.health = Some(-2);
        let records = vec![legacy, record(1, "health", 1)];
        assert_eq!(all_time_average("health", &records), -0.5);
    }

    #[test]
    fn negative_window_is_rejected() {
        assert_eq!(
            trailing_average("health", &[], -1, reference_day()),
            Err(StatsError::InvalidWindow(-1))
        );
    }

    #[test]
    fn huge_window_covers_everything() {
        let records = vec![record(5000, "health", 2), record(0, "health", 0)];
        assert_eq!(
            trailing_average("health", &records, i64::MAX, reference_day()),
            Ok(1.0)
        );
    }

    #[test]
    fn summarize_keeps_category_order_on_empty_input() {
        let categories = vec![
            Category::new("work", "Work", 2),
            Category::new("health", "Health", 1),
            Category::new("growth", "Growth", 3),
        ];
        let summaries = summarize(&categories, &[], reference_day());
        let identifiers: Vec<&str> = summaries.iter().map(|s| s.identifier.as_str()).collect();
        assert_eq!(identifiers, vec!["work", "health", "growth"]);
        for summary in summaries {
            assert_eq!(
                summary.averages,
                RollingAverages {
                    all_time: 0.0,
                    trailing_10: 0.0,
                    trailing_30: 0.0,
                }
            );
        }
    }

    #[test]
    fn summary_windows_agree_with_trailing_average() {
        let categories = vec![Category::new("work", "Work", 1)];
        let records = vec![
            record(0, "work", 1),
            record(10, "work", -2),
            record(11, "work", 2),
            record(30, "work", 2),
            record(31, "work", -2),
        ];
        let averages = summarize(&categories, &records, reference_day())[0].averages;
        assert_eq!(
            Ok(averages.trailing_10),
            trailing_average("work", &records, 10, reference_day())
        );
        assert_eq!(
            Ok(averages.trailing_30),
            trailing_average("work", &records, 30, reference_day())
        );
        assert_eq!(averages.trailing_10, -0.5);
        assert_eq!(averages.trailing_30, 0.75);
    }

    #[test]
    fn window_start_clamps_instead_of_failing() {
        assert_eq!(window_start(u64::MAX, reference_day()), NaiveDate::MIN);
        assert_eq!(window_start(0, reference_day()), reference_day());
    }

    #[test]
    fn summarize_uses_ten_and_thirty_day_windows() {
        let categories = vec![Category::new("health", "Health", 1)];
        let records = vec![
            record(2, "health", 2),
            record(20, "health", -2),
            record(60, "health", -2),
        ];
        let summaries = summarize(&categories, &records, reference_day());
        let averages = summaries[0].averages;
        assert!((averages.all_time - (-2.0 / 3.0)).abs() < 1e-9);
        assert_eq!(averages.trailing_10, 2.0);
        assert_eq!(averages.trailing_30, 0.0);
    }

    proptest! {
        #[test]
        fn constant_ratings_average_to_that_rating(
            value in -2i32..=2,
            offsets in prop::collection::vec(0i64..400, 1..50),
        ) {
            let records: Vec<DailyRecord> = offsets
                .iter()
                .map(|days_ago| record(*days_ago, "health", value))
                .collect();
            prop_assert_eq!(all_time_average("health", &records), value as f64);
        }

        #[test]
        fn records_before_the_window_do_not_matter(
            window in 0i64..60,
            inside in prop::collection::vec((0i64..60, -2i32..=2), 0..20),
            extra_gap in 1i64..500,
            extra_value in -2i32..=2,
        ) {
            let mut records: Vec<DailyRecord> = inside
                .iter()
                .map(|(days_ago, value)| record(*days_ago, "health", *value))
                .collect();
            let before = trailing_average("health", &records, window, reference_day());
            records.push(record(window + extra_gap, "health", extra_value));
            let after = trailing_average("health", &records, window, reference_day());
            prop_assert_eq!(before, after);
        }
    }
}
