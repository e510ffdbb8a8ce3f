use serde::{Deserialize, Serialize};

/// Sampling intervals (in minutes) the pipeline accepts.
pub const SUPPORTED_MINUTES: [i64; 4] = [5, 15, 30, 60];

/// The fixed output cadence every series is reconciled to.
pub const CANONICAL_MINUTES: i64 = 15;
pub const CANONICAL_STEP_SECONDS: i64 = CANONICAL_MINUTES * 60;

/// Dominant sampling interval derived from a series. Recomputed per run,
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedFrequency {
    pub minutes: i64,
    pub step_seconds: i64,
}

impl DetectedFrequency {
    pub fn from_minutes(minutes: i64) -> Self {
        Self {
            minutes,
            step_seconds: minutes * 60,
        }
    }

    pub fn is_supported(minutes: i64) -> bool {
        SUPPORTED_MINUTES.contains(&minutes)
    }
}
