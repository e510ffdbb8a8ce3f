use chrono::{DateTime, Datelike, Timelike, Utc};

/// Calendar/position features for one grid slot, in the order the regressor
/// consumes them: hour, day-of-week, month, day-of-year, hours since the
/// series start. Energy demand has strong daily, weekly and seasonal cycles,
/// so these covariates carry most of the predictable signal.
pub const FEATURE_COUNT: usize = 5;

pub type FeatureRow = [f64; FEATURE_COUNT];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub hour: u32,
    pub day_of_week: u32,
    pub month: u32,
    pub day_of_year: u32,
    pub hours_since_start: f64,
}

impl FeatureVector {
    /// Derives features for `timestamp` relative to the series start.
    /// Day-of-week is 0 = Monday .. 6 = Sunday.
    pub fn at(timestamp: i64, start_timestamp: i64) -> Option<Self> {
        let dt = DateTime::<Utc>::from_timestamp(timestamp, 0)?;
        Some(Self {
            hour: dt.hour(),
            day_of_week: dt.weekday().num_days_from_monday(),
            month: dt.month(),
            day_of_year: dt.ordinal(),
            hours_since_start: (timestamp - start_timestamp) as f64 / 3_600.0,
        })
    }

    pub fn as_row(&self) -> FeatureRow {
        [
            self.hour as f64,
            self.day_of_week as f64,
            self.month as f64,
            self.day_of_year as f64,
            self.hours_since_start,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::FeatureVector;

    #[test]
    fn derives_calendar_components() {
        // 2024-07-01T13:30:00Z, a Monday.
        let ts = 1_719_840_600;
        let features = FeatureVector::at(ts, ts - 7_200).unwrap();
        assert_eq!(features.hour, 13);
        assert_eq!(features.day_of_week, 0);
        assert_eq!(features.month, 7);
        assert_eq!(features.day_of_year, 183);
        assert!((features.hours_since_start - 2.0).abs() < 1e-12);
    }

    #[test]
    fn row_order_is_stable() {
        let features = FeatureVector::at(0, 0).unwrap();
        let row = features.as_row();
        assert_eq!(row[0], features.hour as f64);
        assert_eq!(row[4], 0.0);
    }
}
