use chrono::DateTime;
use enfill_domain::value_objects::series::CanonicalSeries;
use std::path::Path;

/// Writes the final series as `timestamp,energy` with RFC 3339 timestamps.
pub fn write_series_csv(path: &Path, series: &CanonicalSeries) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create {}: {}", path.display(), err))?;
    writer
        .write_record(["timestamp", "energy"])
        .map_err(|err| format!("failed to write CSV header: {err}"))?;

    for point in series.points() {
        let timestamp = DateTime::from_timestamp(point.timestamp, 0)
            .ok_or_else(|| format!("unrepresentable timestamp: {}", point.timestamp))?
            .to_rfc3339();
        let value = point
            .value
            .map(|v| v.to_string())
            .unwrap_or_default();
        writer
            .write_record([timestamp.as_str(), value.as_str()])
            .map_err(|err| format!("failed to write CSV row: {err}"))?;
    }
    writer
        .flush()
        .map_err(|err| format!("failed to flush {}: {}", path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::write_series_csv;
    use enfill_domain::value_objects::point::TimeSeriesPoint;
    use enfill_domain::value_objects::series::CanonicalSeries;

    #[test]
    fn writes_header_and_rfc3339_rows() {
        let path = std::env::temp_dir().join(format!("enfill_out_{}.csv", std::process::id()));
        let series = CanonicalSeries::from_sorted(vec![
            TimeSeriesPoint::observed(0, 1.5),
            TimeSeriesPoint::observed(900, 2.0),
        ]);
        write_series_csv(&path, &series).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("timestamp,energy"));
        assert_eq!(lines.next(), Some("1970-01-01T00:00:00+00:00,1.5"));
        assert_eq!(lines.next(), Some("1970-01-01T00:15:00+00:00,2"));
    }
}
