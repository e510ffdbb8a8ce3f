use crate::value_objects::point::TimeSeriesPoint;
use serde::{Deserialize, Serialize};

/// An ordered energy series. Invariant: timestamps are unique and strictly
/// increasing. Constructed by the normalization stage; every later stage
/// consumes one series and produces a new one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanonicalSeries {
    points: Vec<TimeSeriesPoint>,
}

impl CanonicalSeries {
    /// Builds a series from points that are already sorted and deduplicated.
    /// Callers that cannot guarantee ordering go through `normalize_rows`.
    pub fn from_sorted(points: Vec<TimeSeriesPoint>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        Self { points }
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<TimeSeriesPoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn min_timestamp(&self) -> Option<i64> {
        self.points.first().map(|p| p.timestamp)
    }

    pub fn max_timestamp(&self) -> Option<i64> {
        self.points.last().map(|p| p.timestamp)
    }

    /// Number of slots with no observed value.
    pub fn gap_count(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_none()).count()
    }

    pub fn gap_fraction(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.gap_count() as f64 / self.points.len() as f64
    }

    /// Min/max over observed values, `None` when nothing is observed.
    pub fn value_envelope(&self) -> Option<(f64, f64)> {
        let mut envelope: Option<(f64, f64)> = None;
        for value in self.points.iter().filter_map(|p| p.value) {
            envelope = Some(match envelope {
                None => (value, value),
                Some((lo, hi)) => (lo.min(value), hi.max(value)),
            });
        }
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::CanonicalSeries;
    use crate::value_objects::point::TimeSeriesPoint;

    #[test]
    fn gap_fraction_counts_absent_slots() {
        let series = CanonicalSeries::from_sorted(vec![
            TimeSeriesPoint::observed(0, 1.0),
            TimeSeriesPoint::gap(60),
            TimeSeriesPoint::observed(120, 3.0),
            TimeSeriesPoint::gap(180),
        ]);
        assert_eq!(series.gap_count(), 2);
        assert!((series.gap_fraction() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn envelope_ignores_gaps() {
        let series = CanonicalSeries::from_sorted(vec![
            TimeSeriesPoint::observed(0, 5.0),
            TimeSeriesPoint::gap(60),
            TimeSeriesPoint::observed(120, -1.0),
        ]);
        assert_eq!(series.value_envelope(), Some((-1.0, 5.0)));
    }

    #[test]
    fn empty_series_has_no_bounds() {
        let series = CanonicalSeries::default();
        assert_eq!(series.min_timestamp(), None);
        assert_eq!(series.value_envelope(), None);
        assert_eq!(series.gap_fraction(), 0.0);
    }
}
