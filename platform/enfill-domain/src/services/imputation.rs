use crate::errors::PipelineError;
use crate::services::features::{FeatureRow, FeatureVector};
use crate::value_objects::point::TimeSeriesPoint;
use crate::value_objects::series::CanonicalSeries;

/// Missing-data fraction beyond which imputation is refused: past this point
/// the model invents more than it learns.
pub const MAX_GAP_FRACTION: f64 = 0.4;

/// Seam for the imputation model. The production implementation is
/// `forest::RandomForest`; tests substitute sentinels.
pub trait GapRegressor {
    fn fit(&mut self, x: &[FeatureRow], y: &[f64]) -> Result<(), String>;
    fn predict(&self, x: &[FeatureRow]) -> Result<Vec<f64>, String>;
}

/// A filled series plus the numbers the caller wants to log: how many slots
/// were imputed and what fraction of the grid was missing.
#[derive(Debug, Clone)]
pub struct ImputationOutcome {
    pub series: CanonicalSeries,
    pub imputed: usize,
    pub gap_fraction: f64,
}

/// Fills every absent slot of a resampled series with a regression estimate.
/// The fraction check runs before any training; a series with no gaps is
/// returned unchanged without touching the regressor. Regressor failures are
/// internal faults, not validation failures.
pub fn fill_gaps(
    series: &CanonicalSeries,
    regressor: &mut dyn GapRegressor,
) -> Result<ImputationOutcome, PipelineError> {
    let Some(start) = series.min_timestamp() else {
        return Ok(ImputationOutcome {
            series: series.clone(),
            imputed: 0,
            gap_fraction: 0.0,
        });
    };

    let gap_fraction = series.gap_fraction();
    if gap_fraction > MAX_GAP_FRACTION {
        return Err(PipelineError::ExcessiveGaps(gap_fraction));
    }
    if series.gap_count() == 0 {
        return Ok(ImputationOutcome {
            series: series.clone(),
            imputed: 0,
            gap_fraction,
        });
    }

    let mut labeled_x: Vec<FeatureRow> = Vec::new();
    let mut labeled_y: Vec<f64> = Vec::new();
    let mut unlabeled_x: Vec<FeatureRow> = Vec::new();
    for point in series.points() {
        let features = FeatureVector::at(point.timestamp, start).ok_or_else(|| {
            PipelineError::Internal(format!(
                "timestamp {} is outside the representable range",
                point.timestamp
            ))
        })?;
        match point.value {
            Some(value) => {
                labeled_x.push(features.as_row());
                labeled_y.push(value);
            }
            None => unlabeled_x.push(features.as_row()),
        }
    }

    regressor
        .fit(&labeled_x, &labeled_y)
        .map_err(PipelineError::Internal)?;
    let predictions = regressor
        .predict(&unlabeled_x)
        .map_err(PipelineError::Internal)?;
    if predictions.len() != unlabeled_x.len() {
        return Err(PipelineError::Internal(format!(
            "regressor returned {} predictions for {} gaps",
            predictions.len(),
            unlabeled_x.len()
        )));
    }

    let mut filled = Vec::with_capacity(series.len());
    let mut next_prediction = predictions.into_iter();
    for point in series.points() {
        match point.value {
            Some(value) => filled.push(TimeSeriesPoint::observed(point.timestamp, value)),
            None => filled.push(TimeSeriesPoint::observed(
                point.timestamp,
                next_prediction.next().ok_or_else(|| {
                    PipelineError::Internal("ran out of predictions".to_string())
                })?,
            )),
        }
    }

    Ok(ImputationOutcome {
        imputed: unlabeled_x.len(),
        gap_fraction,
        series: CanonicalSeries::from_sorted(filled),
    })
}

#[cfg(test)]
mod tests {
    use super::{fill_gaps, GapRegressor, ImputationOutcome};
    use crate::errors::PipelineError;
    use crate::services::features::FeatureRow;
    use crate::value_objects::point::TimeSeriesPoint;
    use crate::value_objects::series::CanonicalSeries;

    /// Fails the test if the model is ever trained or queried.
    struct SentinelRegressor;

    impl GapRegressor for SentinelRegressor {
        fn fit(&mut self, _: &[FeatureRow], _: &[f64]) -> Result<(), String> {
            panic!("training must be skipped for a complete series");
        }
        fn predict(&self, _: &[FeatureRow]) -> Result<Vec<f64>, String> {
            panic!("prediction must be skipped for a complete series");
        }
    }

    /// Predicts a fixed value for every gap.
    struct ConstantRegressor(f64);

    impl GapRegressor for ConstantRegressor {
        fn fit(&mut self, x: &[FeatureRow], y: &[f64]) -> Result<(), String> {
            assert_eq!(x.len(), y.len());
            Ok(())
        }
        fn predict(&self, x: &[FeatureRow]) -> Result<Vec<f64>, String> {
            Ok(vec![self.0; x.len()])
        }
    }

    struct FailingRegressor;

    impl GapRegressor for FailingRegressor {
        fn fit(&mut self, _: &[FeatureRow], _: &[f64]) -> Result<(), String> {
            Err("singular matrix".to_string())
        }
        fn predict(&self, _: &[FeatureRow]) -> Result<Vec<f64>, String> {
            Err("unfitted".to_string())
        }
    }

    fn grid(values: &[Option<f64>]) -> CanonicalSeries {
        CanonicalSeries::from_sorted(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| TimeSeriesPoint {
                    timestamp: i as i64 * 900,
                    value: *v,
                })
                .collect(),
        )
    }

    #[test]
    fn complete_series_skips_the_model_entirely() {
        let series = grid(&[Some(1.0), Some(2.0), Some(3.0)]);
        let ImputationOutcome {
            series: out,
            imputed,
            ..
        } = fill_gaps(&series, &mut SentinelRegressor).unwrap();
        assert_eq!(out, series);
        assert_eq!(imputed, 0);
    }

    #[test]
    fn gaps_are_filled_in_slot_order() {
        let series = grid(&[Some(1.0), None, Some(3.0), None, Some(5.0)]);
        let outcome = fill_gaps(&series, &mut ConstantRegressor(9.0)).unwrap();
        assert_eq!(outcome.imputed, 2);
        assert_eq!(outcome.series.gap_count(), 0);
        assert_eq!(outcome.series.points()[1].value, Some(9.0));
        assert_eq!(outcome.series.points()[3].value, Some(9.0));
        assert_eq!(outcome.series.points()[2].value, Some(3.0));
    }

    #[test]
    fn exactly_forty_percent_missing_passes() {
        let series = grid(&[Some(1.0), Some(2.0), Some(3.0), None, None]);
        assert!(fill_gaps(&series, &mut ConstantRegressor(0.0)).is_ok());
    }

    #[test]
    fn above_forty_percent_missing_fails_before_training() {
        let series = grid(&[Some(1.0), Some(2.0), None, None, None]);
        // SentinelRegressor would panic if training were attempted.
        let err = fill_gaps(&series, &mut SentinelRegressor).unwrap_err();
        match err {
            PipelineError::ExcessiveGaps(fraction) => {
                assert!((fraction - 0.6).abs() < 1e-12);
            }
            other => panic!("expected ExcessiveGaps, got {other:?}"),
        }
    }

    #[test]
    fn regressor_failure_is_an_internal_fault() {
        let series = grid(&[Some(1.0), None, Some(3.0)]);
        let err = fill_gaps(&series, &mut FailingRegressor).unwrap_err();
        assert!(matches!(err, PipelineError::Internal(_)));
    }

    #[test]
    fn empty_series_is_a_no_op() {
        let outcome = fill_gaps(&CanonicalSeries::default(), &mut SentinelRegressor).unwrap();
        assert!(outcome.series.is_empty());
        assert_eq!(outcome.imputed, 0);
    }
}
