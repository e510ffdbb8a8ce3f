use crate::config::ModelConfig;
use enfill_domain::errors::PipelineError;
use enfill_domain::repositories::table_source::TableSource;
use enfill_domain::services::canonical::canonicalize_cadence;
use enfill_domain::services::forest::RandomForest;
use enfill_domain::services::frequency::detect_frequency;
use enfill_domain::services::imputation::fill_gaps;
use enfill_domain::services::normalize::normalize_rows;
use enfill_domain::services::resample::reindex_to_grid;
use enfill_domain::services::sufficiency::{has_minimum_history, MIN_HISTORY_MONTHS};
use enfill_domain::value_objects::point::TimeSeriesPoint;
use enfill_domain::value_objects::series::CanonicalSeries;
use serde::Serialize;
use std::time::Instant;
use tracing::info_span;

/// What one pipeline run did, for logs and the CLI summary line.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub rows_in: usize,
    pub series_len: usize,
    pub detected_minutes: i64,
    pub grid_slots: usize,
    pub imputed: usize,
    pub gap_fraction: f64,
    pub clamped: usize,
    pub rows_out: usize,
}

/// Runs the whole gap-filling pipeline over one table: normalize, detect the
/// sampling frequency, validate history depth, reindex onto the regular
/// grid, impute the gaps with the forest, then reconcile to the 15-minute
/// output cadence. One synchronous computation per call, no shared state.
pub fn run_gap_fill(
    source: &dyn TableSource,
    model: &ModelConfig,
) -> Result<(CanonicalSeries, PipelineSummary), PipelineError> {
    let _span = info_span!("gap_fill_pipeline").entered();

    let stage_start = Instant::now();
    let rows = source.read_rows()?;
    let series = normalize_rows(&rows)?;
    metrics::histogram!("enfill.pipeline.normalize_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    tracing::info!(
        rows_in = rows.len(),
        readings = series.len(),
        "table normalized"
    );

    let frequency = detect_frequency(&series)?;
    tracing::info!(minutes = frequency.minutes, "sampling frequency detected");

    if !has_minimum_history(&series, frequency.step_seconds) {
        let min_ts = series.min_timestamp().unwrap_or(0);
        let max_ts = series.max_timestamp().unwrap_or(min_ts);
        return Err(PipelineError::InsufficientHistory {
            span_days: (max_ts - min_ts) / 86_400,
            required_days: MIN_HISTORY_MONTHS as i64 * 30,
        });
    }

    let stage_start = Instant::now();
    let grid = reindex_to_grid(&series, frequency.step_seconds);
    metrics::histogram!("enfill.pipeline.resample_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    let stage_start = Instant::now();
    let mut forest = RandomForest::new(model.forest_params());
    let outcome = fill_gaps(&grid, &mut forest)?;
    metrics::histogram!("enfill.pipeline.impute_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    metrics::counter!("enfill.pipeline.imputed_slots").increment(outcome.imputed as u64);
    tracing::info!(
        imputed = outcome.imputed,
        missing_pct = format!("{:.2}", outcome.gap_fraction * 100.0),
        "gaps imputed"
    );

    let stage_start = Instant::now();
    let canonical = canonicalize_cadence(&outcome.series, frequency)?;
    metrics::histogram!("enfill.pipeline.canonicalize_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    let (result, clamped) = if model.clamp_negative {
        clamp_negatives(canonical)
    } else {
        (canonical, 0)
    };
    if clamped > 0 {
        tracing::warn!(clamped, "negative imputed readings floored at zero");
    }

    let summary = PipelineSummary {
        rows_in: rows.len(),
        series_len: series.len(),
        detected_minutes: frequency.minutes,
        grid_slots: grid.len(),
        imputed: outcome.imputed,
        gap_fraction: outcome.gap_fraction,
        clamped,
        rows_out: result.len(),
    };
    Ok((result, summary))
}

fn clamp_negatives(series: CanonicalSeries) -> (CanonicalSeries, usize) {
    let mut clamped = 0usize;
    let points = series
        .into_points()
        .into_iter()
        .map(|point| match point.value {
            Some(value) if value < 0.0 => {
                clamped += 1;
                TimeSeriesPoint::observed(point.timestamp, 0.0)
            }
            _ => point,
        })
        .collect();
    (CanonicalSeries::from_sorted(points), clamped)
}

#[cfg(test)]
mod tests {
    use super::clamp_negatives;
    use enfill_domain::value_objects::point::TimeSeriesPoint;
    use enfill_domain::value_objects::series::CanonicalSeries;

    #[test]
    fn clamp_floors_negatives_and_counts_them() {
        let series = CanonicalSeries::from_sorted(vec![
            TimeSeriesPoint::observed(0, -1.5),
            TimeSeriesPoint::observed(900, 2.0),
            TimeSeriesPoint::observed(1800, -0.1),
        ]);
        let (out, clamped) = clamp_negatives(series);
        assert_eq!(clamped, 2);
        assert_eq!(out.points()[0].value, Some(0.0));
        assert_eq!(out.points()[1].value, Some(2.0));
    }
}
