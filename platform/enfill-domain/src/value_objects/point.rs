use serde::{Deserialize, Serialize};

/// One reading in a canonical series. Timestamps are UTC epoch seconds;
/// `value` is `None` for a grid slot with no observed reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: i64,
    pub value: Option<f64>,
}

impl TimeSeriesPoint {
    pub fn observed(timestamp: i64, value: f64) -> Self {
        Self {
            timestamp,
            value: Some(value),
        }
    }

    pub fn gap(timestamp: i64) -> Self {
        Self {
            timestamp,
            value: None,
        }
    }
}
