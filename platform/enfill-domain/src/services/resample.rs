use crate::value_objects::point::TimeSeriesPoint;
use crate::value_objects::series::CanonicalSeries;
use std::collections::HashMap;

/// Reindexes a series onto a regular grid: every timestamp from the series
/// minimum to its maximum stepped by `step_seconds`. Points already on the
/// grid keep their value; every other slot becomes an explicit gap. Points
/// that fall between grid slots are dropped. The grid anchors at the series
/// start, which makes the operation idempotent for any regular series.
pub fn reindex_to_grid(series: &CanonicalSeries, step_seconds: i64) -> CanonicalSeries {
    let (Some(min_ts), Some(max_ts)) = (series.min_timestamp(), series.max_timestamp()) else {
        return CanonicalSeries::default();
    };

    let by_timestamp: HashMap<i64, Option<f64>> = series
        .points()
        .iter()
        .map(|p| (p.timestamp, p.value))
        .collect();

    let slots = ((max_ts - min_ts) / step_seconds + 1) as usize;
    let mut points = Vec::with_capacity(slots);
    let mut ts = min_ts;
    while ts <= max_ts {
        let value = by_timestamp.get(&ts).copied().flatten();
        points.push(TimeSeriesPoint {
            timestamp: ts,
            value,
        });
        ts += step_seconds;
    }
    CanonicalSeries::from_sorted(points)
}

#[cfg(test)]
mod tests {
    use super::reindex_to_grid;
    use crate::value_objects::point::TimeSeriesPoint;
    use crate::value_objects::series::CanonicalSeries;

    #[test]
    fn missing_slots_become_explicit_gaps() {
        let series = CanonicalSeries::from_sorted(vec![
            TimeSeriesPoint::observed(0, 1.0),
            TimeSeriesPoint::observed(1800, 3.0),
        ]);
        let grid = reindex_to_grid(&series, 900);
        assert_eq!(grid.len(), 3);
        assert_eq!(grid.points()[1], TimeSeriesPoint::gap(900));
        assert_eq!(grid.points()[2].value, Some(3.0));
    }

    #[test]
    fn regular_series_is_unchanged() {
        let series = CanonicalSeries::from_sorted(
            (0..10)
                .map(|i| TimeSeriesPoint::observed(i * 900, i as f64))
                .collect(),
        );
        assert_eq!(reindex_to_grid(&series, 900), series);
    }

    #[test]
    fn reindexing_is_idempotent() {
        let series = CanonicalSeries::from_sorted(vec![
            TimeSeriesPoint::observed(0, 1.0),
            TimeSeriesPoint::observed(2700, 2.0),
            TimeSeriesPoint::observed(3600, 5.0),
        ]);
        let once = reindex_to_grid(&series, 900);
        let twice = reindex_to_grid(&once, 900);
        assert_eq!(once, twice);
    }

    #[test]
    fn off_grid_points_are_dropped() {
        let series = CanonicalSeries::from_sorted(vec![
            TimeSeriesPoint::observed(0, 1.0),
            TimeSeriesPoint::observed(450, 9.0),
            TimeSeriesPoint::observed(900, 2.0),
        ]);
        let grid = reindex_to_grid(&series, 900);
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.points()[0].value, Some(1.0));
        assert_eq!(grid.points()[1].value, Some(2.0));
    }

    #[test]
    fn empty_series_stays_empty() {
        let grid = reindex_to_grid(&CanonicalSeries::default(), 900);
        assert!(grid.is_empty());
    }
}
