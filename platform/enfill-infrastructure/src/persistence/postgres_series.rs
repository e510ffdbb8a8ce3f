use chrono::{DateTime, Utc};
use enfill_domain::repositories::series_store::SeriesStore;
use enfill_domain::value_objects::series::CanonicalSeries;
use postgres::{Client, NoTls};
use std::time::Instant;

const UPSERT_BATCH_SIZE: usize = 500;

/// Stores a filled series into Postgres. One connection per call; the
/// upsert keys on the reading timestamp so re-running a file refreshes
/// existing rows instead of duplicating them.
#[derive(Debug, Clone)]
pub struct PostgresSeriesStore {
    db_url: String,
    table: String,
}

impl PostgresSeriesStore {
    pub fn new(db_url: String, table: String) -> Result<Self, String> {
        if let Err(err) = validate_table_name(&table) {
            return Err(format!("invalid table '{}': {}", table, err));
        }
        Ok(Self { db_url, table })
    }
}

impl SeriesStore for PostgresSeriesStore {
    fn store(&self, series: &CanonicalSeries) -> Result<u64, String> {
        let start = Instant::now();
        let span = tracing::info_span!(
            "infra.postgres.store_series",
            table = %self.table,
            rows = series.len()
        );
        let _enter = span.enter();

        let mut client = Client::connect(&self.db_url, NoTls)
            .map_err(|err| format!("failed to connect to postgres: {err}"))?;

        let statement = client
            .prepare(&format!(
                "INSERT INTO {} (energy, timestamp_utc)
                 VALUES ($1, $2)
                 ON CONFLICT (timestamp_utc)
                 DO UPDATE SET
                     energy = EXCLUDED.energy,
                     updated_at = NOW()",
                self.table
            ))
            .map_err(|err| format!("failed to prepare upsert: {err}"))?;

        let mut total = 0u64;
        let mut transaction = client
            .transaction()
            .map_err(|err| format!("failed to start transaction: {err}"))?;

        for chunk in series.points().chunks(UPSERT_BATCH_SIZE) {
            for point in chunk {
                let Some(value) = point.value else {
                    continue;
                };
                let timestamp: DateTime<Utc> = DateTime::from_timestamp(point.timestamp, 0)
                    .ok_or_else(|| format!("unrepresentable timestamp: {}", point.timestamp))?;
                transaction
                    .execute(&statement, &[&value, &timestamp])
                    .map_err(|err| format!("upsert failed: {err}"))?;
                total += 1;
            }
        }

        transaction
            .commit()
            .map_err(|err| format!("failed to commit: {err}"))?;

        metrics::histogram!("enfill.infra.postgres.store_ms")
            .record(start.elapsed().as_millis() as f64);
        tracing::info!(rows = total, "series stored");
        Ok(total)
    }
}

fn validate_table_name(table: &str) -> Result<(), String> {
    if table.is_empty() {
        return Err("table name is empty".to_string());
    }
    let parts: Vec<&str> = table.split('.').collect();
    if parts.len() > 2 {
        return Err(format!("invalid table name: {table}"));
    }
    for part in parts {
        if part.is_empty() {
            return Err(format!("invalid table name: {table}"));
        }
        let mut chars = part.chars();
        let first = chars.next().unwrap_or('0');
        if !(first.is_ascii_alphabetic() || first == '_') {
            return Err(format!("invalid table name: {table}"));
        }
        if !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
            return Err(format!("invalid table name: {table}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_table_name, PostgresSeriesStore};

    #[test]
    fn validate_table_name_accepts_schema_qualified_names() {
        assert!(validate_table_name("energy_readings").is_ok());
        assert!(validate_table_name("public.energy_readings").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("readings;drop").is_err());
        assert!(validate_table_name("1readings").is_err());
    }

    #[test]
    fn store_rejects_invalid_table_name_before_connecting() {
        let err = PostgresSeriesStore::new(
            "postgres://invalid".to_string(),
            "readings;drop".to_string(),
        )
        .expect_err("invalid table name");
        assert!(err.contains("invalid table"));
    }
}
