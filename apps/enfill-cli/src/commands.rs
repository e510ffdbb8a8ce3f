use enfill_application::config::Config;
use enfill_application::pipeline::run_gap_fill;
use enfill_domain::errors::PipelineError;
use enfill_domain::repositories::series_store::SeriesStore;
use enfill_domain::services::frequency::detect_frequency;
use enfill_domain::services::normalize::normalize_rows;
use enfill_domain::services::resample::reindex_to_grid;
use enfill_domain::services::sufficiency::has_minimum_history;
use enfill_infrastructure::output::write_series_csv;
use enfill_infrastructure::persistence::postgres_series::PostgresSeriesStore;
use enfill_infrastructure::tables::open_table;
use serde_json::json;
use std::path::Path;

pub fn run_fill(
    config: &Config,
    input: &Path,
    out: &Path,
    store: bool,
) -> Result<serde_json::Value, PipelineError> {
    let source = open_table(input)?;
    let (series, summary) = run_gap_fill(source.as_ref(), &config.model)?;

    write_series_csv(out, &series).map_err(PipelineError::Io)?;
    tracing::info!(path = %out.display(), rows = series.len(), "filled series written");

    let mut stored = 0u64;
    if store {
        let db = config
            .db
            .as_ref()
            .ok_or_else(|| PipelineError::Internal("--store requires a [db] config section".to_string()))?;
        let repo = PostgresSeriesStore::new(db.url.clone(), db.table.clone())
            .map_err(PipelineError::Internal)?;
        stored = repo.store(&series).map_err(PipelineError::Internal)?;
    }

    Ok(json!({
        "status": "ok",
        "out": out.display().to_string(),
        "stored": stored,
        "summary": summary,
    }))
}

pub fn run_inspect(input: &Path) -> Result<serde_json::Value, PipelineError> {
    let source = open_table(input)?;
    let rows = source.read_rows()?;
    let series = normalize_rows(&rows)?;
    let frequency = detect_frequency(&series)?;
    let grid = reindex_to_grid(&series, frequency.step_seconds);

    Ok(json!({
        "status": "ok",
        "rows_in": rows.len(),
        "readings": series.len(),
        "detected_minutes": frequency.minutes,
        "grid_slots": grid.len(),
        "gap_fraction": grid.gap_fraction(),
        "sufficient_history": has_minimum_history(&series, frequency.step_seconds),
        "first_timestamp": series.min_timestamp(),
        "last_timestamp": series.max_timestamp(),
    }))
}

pub fn run_migrate(
    config: &Config,
    db_url: Option<&str>,
    migrations: &Path,
) -> Result<serde_json::Value, PipelineError> {
    let url = match db_url {
        Some(url) if !url.trim().is_empty() => url.to_string(),
        _ => config
            .db
            .as_ref()
            .map(|db| db.url.clone())
            .ok_or_else(|| {
                PipelineError::Internal(
                    "missing --db-url and no [db] config section".to_string(),
                )
            })?,
    };

    let mut paths: Vec<_> = std::fs::read_dir(migrations)
        .map_err(|err| {
            PipelineError::Io(format!("failed to read {}: {}", migrations.display(), err))
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "sql"))
        .collect();
    paths.sort();

    let mut client = postgres::Client::connect(&url, postgres::NoTls)
        .map_err(|err| PipelineError::Internal(format!("failed to connect to postgres: {err}")))?;

    let mut applied = Vec::new();
    for path in paths {
        let sql = std::fs::read_to_string(&path)
            .map_err(|err| PipelineError::Io(format!("failed to read {}: {}", path.display(), err)))?;
        client.batch_execute(&sql).map_err(|err| {
            PipelineError::Internal(format!("migration {} failed: {}", path.display(), err))
        })?;
        tracing::info!(migration = %path.display(), "migration applied");
        applied.push(path.display().to_string());
    }

    Ok(json!({ "status": "ok", "applied": applied }))
}
