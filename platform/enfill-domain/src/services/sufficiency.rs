use crate::value_objects::series::CanonicalSeries;
use chrono::{DateTime, Duration, Months, Utc};

/// Minimum span of history, in calendar months, before imputation is allowed.
pub const MIN_HISTORY_MONTHS: u32 = 4;

/// Checks that the series covers at least four calendar months at the
/// detected interval. The boundary is `min + 4 months - 1 interval`, so a
/// series ending exactly one interval short of the four-month mark still
/// passes rather than being rejected by an off-by-one.
pub fn has_minimum_history(series: &CanonicalSeries, step_seconds: i64) -> bool {
    let (Some(min_ts), Some(max_ts)) = (series.min_timestamp(), series.max_timestamp()) else {
        return false;
    };
    let Some(start) = DateTime::<Utc>::from_timestamp(min_ts, 0) else {
        return false;
    };
    let Some(boundary) = start
        .checked_add_months(Months::new(MIN_HISTORY_MONTHS))
        .map(|dt| dt - Duration::seconds(step_seconds))
    else {
        return false;
    };
    max_ts >= boundary.timestamp()
}

#[cfg(test)]
mod tests {
    use super::has_minimum_history;
    use crate::value_objects::point::TimeSeriesPoint;
    use crate::value_objects::series::CanonicalSeries;
    use chrono::{DateTime, Months, Utc};

    fn series_between(start: i64, end: i64) -> CanonicalSeries {
        CanonicalSeries::from_sorted(vec![
            TimeSeriesPoint::observed(start, 1.0),
            TimeSeriesPoint::observed(end, 2.0),
        ])
    }

    fn four_months_after(start: i64) -> i64 {
        DateTime::<Utc>::from_timestamp(start, 0)
            .unwrap()
            .checked_add_months(Months::new(4))
            .unwrap()
            .timestamp()
    }

    #[test]
    fn exactly_four_months_minus_one_interval_passes() {
        let start = 1_704_067_200; // 2024-01-01T00:00:00Z
        let step = 900;
        let boundary = four_months_after(start) - step;
        assert!(has_minimum_history(&series_between(start, boundary), step));
    }

    #[test]
    fn one_interval_short_of_the_boundary_fails() {
        let start = 1_704_067_200;
        let step = 900;
        let boundary = four_months_after(start) - step;
        assert!(!has_minimum_history(
            &series_between(start, boundary - step),
            step
        ));
    }

    #[test]
    fn a_year_of_history_passes() {
        let start = 1_704_067_200;
        assert!(has_minimum_history(
            &series_between(start, start + 365 * 86_400),
            900
        ));
    }

    #[test]
    fn empty_series_fails() {
        assert!(!has_minimum_history(&CanonicalSeries::default(), 900));
    }
}
