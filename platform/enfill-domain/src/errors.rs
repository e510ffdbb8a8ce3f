/// Failure taxonomy for the gap-filling pipeline. Client-class failures are
/// caused by the submitted data and map to 4xx in an HTTP-facing layer;
/// everything else maps to 5xx with an opaque message.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// File extension is neither `csv` nor `xlsx`.
    UnsupportedFormat(String),
    /// Table does not have exactly 2 or 3 columns.
    InvalidSchema(usize),
    /// A timestamp cell could not be parsed; carries the offending text.
    InvalidDatetime(String),
    /// A value cell could not be parsed as a number.
    InvalidValue(String),
    /// Fewer than two usable readings, nothing can be derived.
    InsufficientData,
    /// Dominant interval is not one of the supported set; carries minutes.
    UnsupportedFrequency(f64),
    /// Series spans less history than the sufficiency window requires.
    InsufficientHistory { span_days: i64, required_days: i64 },
    /// Missing-data fraction beyond which imputation is refused.
    ExcessiveGaps(f64),
    Io(String),
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller can fix the input; never retried.
    Client,
    /// Unexpected fault, surfaced opaquely.
    Internal,
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::Io(_) | PipelineError::Internal(_) => ErrorClass::Internal,
            _ => ErrorClass::Client,
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::UnsupportedFormat(ext) => write!(
                f,
                "unsupported file format `{ext}`, expected a .csv or .xlsx file"
            ),
            PipelineError::InvalidSchema(count) => write!(
                f,
                "table must have exactly 2 or 3 columns, found {count}"
            ),
            PipelineError::InvalidDatetime(raw) => {
                write!(f, "could not parse `{raw}` as a date or datetime")
            }
            PipelineError::InvalidValue(raw) => {
                write!(f, "could not parse `{raw}` as a numeric reading")
            }
            PipelineError::InsufficientData => {
                write!(f, "series needs at least two readings")
            }
            PipelineError::UnsupportedFrequency(minutes) => write!(
                f,
                "detected sampling interval of {minutes} minutes is not supported (expected 5, 15, 30 or 60)"
            ),
            PipelineError::InsufficientHistory {
                span_days,
                required_days,
            } => write!(
                f,
                "series spans {span_days} days but at least {required_days} days of history are required"
            ),
            PipelineError::ExcessiveGaps(fraction) => write!(
                f,
                "{:.2}% of readings are missing, above the 40% limit for reliable imputation",
                fraction * 100.0
            ),
            PipelineError::Io(msg) => write!(f, "io error: {msg}"),
            PipelineError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}
