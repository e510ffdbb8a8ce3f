use crate::errors::PipelineError;
use crate::services::resample::reindex_to_grid;
use crate::value_objects::frequency::{DetectedFrequency, CANONICAL_STEP_SECONDS};
use crate::value_objects::point::TimeSeriesPoint;
use crate::value_objects::series::CanonicalSeries;

/// Reconciles an imputed series at its native interval to the fixed
/// 15-minute cadence. 15-minute input passes through, 5-minute input is
/// averaged in aligned groups of three, and 30/60-minute input is spread
/// onto the finer grid with the new slots filled by linear interpolation.
/// The input must already be gap-free at its native interval.
pub fn canonicalize_cadence(
    series: &CanonicalSeries,
    frequency: DetectedFrequency,
) -> Result<CanonicalSeries, PipelineError> {
    match frequency.minutes {
        15 => Ok(series.clone()),
        5 => Ok(downsample_average(series, CANONICAL_STEP_SECONDS)),
        30 | 60 => Ok(interpolate_gaps(&reindex_to_grid(
            series,
            CANONICAL_STEP_SECONDS,
        ))),
        other => Err(PipelineError::UnsupportedFrequency(other as f64)),
    }
}

/// Buckets points into windows of `step_seconds` anchored at the series
/// start and averages the observed values of each window.
fn downsample_average(series: &CanonicalSeries, step_seconds: i64) -> CanonicalSeries {
    let Some(min_ts) = series.min_timestamp() else {
        return CanonicalSeries::default();
    };

    let mut points: Vec<TimeSeriesPoint> = Vec::new();
    let mut bucket_start = min_ts;
    let mut sum = 0.0;
    let mut count = 0usize;
    for point in series.points() {
        let bucket = min_ts + (point.timestamp - min_ts) / step_seconds * step_seconds;
        if bucket != bucket_start {
            points.push(bucket_point(bucket_start, sum, count));
            bucket_start = bucket;
            sum = 0.0;
            count = 0;
        }
        if let Some(value) = point.value {
            sum += value;
            count += 1;
        }
    }
    points.push(bucket_point(bucket_start, sum, count));
    CanonicalSeries::from_sorted(points)
}

fn bucket_point(timestamp: i64, sum: f64, count: usize) -> TimeSeriesPoint {
    if count == 0 {
        TimeSeriesPoint::gap(timestamp)
    } else {
        TimeSeriesPoint::observed(timestamp, sum / count as f64)
    }
}

/// Fills absent slots by linear interpolation between the nearest observed
/// neighbors; a slot with a neighbor on one side only takes that neighbor's
/// value. Inside the pipeline both endpoints of the fine grid carry values
/// (they come from the coarse grid), so the one-sided case is a safety net
/// for standalone use.
fn interpolate_gaps(series: &CanonicalSeries) -> CanonicalSeries {
    let points = series.points();
    let n = points.len();

    let mut next_known: Vec<Option<usize>> = vec![None; n];
    let mut upcoming = None;
    for i in (0..n).rev() {
        if points[i].value.is_some() {
            upcoming = Some(i);
        }
        next_known[i] = upcoming;
    }

    let mut filled = Vec::with_capacity(n);
    let mut previous: Option<usize> = None;
    for (i, point) in points.iter().enumerate() {
        if point.value.is_some() {
            previous = Some(i);
            filled.push(*point);
            continue;
        }
        let value = match (previous, next_known[i]) {
            (Some(p), Some(q)) => {
                let (p, q) = (&points[p], &points[q]);
                let span = (q.timestamp - p.timestamp) as f64;
                let offset = (point.timestamp - p.timestamp) as f64;
                let (a, b) = (p.value.unwrap_or(0.0), q.value.unwrap_or(0.0));
                Some(a + (b - a) * offset / span)
            }
            (Some(p), None) => points[p].value,
            (None, Some(q)) => points[q].value,
            (None, None) => None,
        };
        filled.push(TimeSeriesPoint {
            timestamp: point.timestamp,
            value,
        });
    }
    CanonicalSeries::from_sorted(filled)
}
