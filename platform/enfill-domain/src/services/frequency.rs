use crate::errors::PipelineError;
use crate::value_objects::frequency::DetectedFrequency;
use crate::value_objects::series::CanonicalSeries;
use std::collections::BTreeMap;

/// Derives the dominant sampling interval: the mode of the first differences
/// between consecutive timestamps. Ties are broken towards the smallest
/// interval (counts are scanned in ascending interval order and a candidate
/// must be strictly more frequent to displace the current mode).
pub fn detect_frequency(series: &CanonicalSeries) -> Result<DetectedFrequency, PipelineError> {
    let points = series.points();
    if points.len() < 2 {
        return Err(PipelineError::InsufficientData);
    }

    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for pair in points.windows(2) {
        *counts.entry(pair[1].timestamp - pair[0].timestamp).or_insert(0) += 1;
    }

    let mut mode_seconds = 0i64;
    let mut mode_count = 0usize;
    for (step, count) in counts {
        if count > mode_count {
            mode_seconds = step;
            mode_count = count;
        }
    }

    if mode_seconds % 60 != 0 {
        return Err(PipelineError::UnsupportedFrequency(
            mode_seconds as f64 / 60.0,
        ));
    }
    let minutes = mode_seconds / 60;
    if !DetectedFrequency::is_supported(minutes) {
        return Err(PipelineError::UnsupportedFrequency(minutes as f64));
    }
    Ok(DetectedFrequency::from_minutes(minutes))
}
