use crate::errors::PipelineError;
use crate::repositories::table_source::RawTable;
use crate::value_objects::point::TimeSeriesPoint;
use crate::value_objects::series::CanonicalSeries;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// Days between the Excel day-serial epoch (1899-12-30) and the Unix epoch.
const EXCEL_EPOCH_OFFSET_DAYS: f64 = 25_569.0;

/// Turns raw table rows into a canonical series: drops rows with absent
/// fields, extracts the timestamp (3 columns: date + time concatenated,
/// 2 columns: second column is the datetime, first the reading), parses the
/// reading, sorts ascending and keeps the first of any duplicate timestamp.
pub fn normalize_rows(rows: &RawTable) -> Result<CanonicalSeries, PipelineError> {
    let Some(first) = rows.first() else {
        return Err(PipelineError::InsufficientData);
    };
    let width = first.len();
    if width != 2 && width != 3 {
        return Err(PipelineError::InvalidSchema(width));
    }

    let cleaned: Vec<&Vec<String>> = rows
        .iter()
        .filter(|row| row.len() == width && row.iter().all(|cell| !cell.trim().is_empty()))
        .collect();
    if cleaned.is_empty() {
        return Err(PipelineError::InsufficientData);
    }

    let mut parsed: Vec<(i64, f64)> = Vec::with_capacity(cleaned.len());
    if width == 3 {
        let first_date = cleaned[0][0].trim();
        if parse_timestamp(first_date).is_none() {
            return Err(PipelineError::InvalidDatetime(first_date.to_string()));
        }
        for row in &cleaned {
            let combined = format!("{} {}", row[0].trim(), row[1].trim());
            let timestamp = parse_timestamp(&combined)
                .ok_or_else(|| PipelineError::InvalidDatetime(combined.clone()))?;
            parsed.push((timestamp, parse_value(&row[2])?));
        }
    } else {
        for row in &cleaned {
            let raw = row[1].trim();
            let timestamp = parse_timestamp(raw)
                .ok_or_else(|| PipelineError::InvalidDatetime(raw.to_string()))?;
            parsed.push((timestamp, parse_value(&row[0])?));
        }
    }

    parsed.sort_by_key(|(timestamp, _)| *timestamp);
    parsed.dedup_by_key(|(timestamp, _)| *timestamp);

    let points = parsed
        .into_iter()
        .map(|(timestamp, value)| TimeSeriesPoint::observed(timestamp, value))
        .collect();
    Ok(CanonicalSeries::from_sorted(points))
}

fn parse_value(raw: &str) -> Result<f64, PipelineError> {
    let trimmed = raw.trim();
    trimmed
        .parse::<f64>()
        .map_err(|_| PipelineError::InvalidValue(trimmed.to_string()))
}

/// Parses a timestamp cell. Tries RFC 3339, a fixed ladder of datetime and
/// bare-date formats, then Excel day serials (so XLSX date cells, which
/// arrive as numbers, still resolve).
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.timestamp());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.and_utc().timestamp());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
        }
    }
    parse_excel_serial(trimmed)
}

fn parse_excel_serial(value: &str) -> Option<i64> {
    let serial: f64 = value.parse().ok()?;
    // Serials below 61 predate 1900-03-01 and hit the Lotus leap-year bug;
    // the upper bound keeps ordinary numeric readings from masquerading as
    // dates (80000 is the year 2119).
    if !(61.0..80_000.0).contains(&serial) {
        return None;
    }
    Some(((serial - EXCEL_EPOCH_OFFSET_DAYS) * 86_400.0).round() as i64)
}
