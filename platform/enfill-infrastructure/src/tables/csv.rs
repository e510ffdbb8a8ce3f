use enfill_domain::errors::PipelineError;
use enfill_domain::repositories::table_source::{RawTable, TableSource};
use std::fs::File;
use std::path::PathBuf;

/// CSV adapter: the first record is treated as the header and sets the table
/// width; data rows are padded with empty cells up to that width so the
/// normalization stage sees uniform rows.
#[derive(Debug)]
pub struct CsvTable {
    path: PathBuf,
}

impl CsvTable {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TableSource for CsvTable {
    fn read_rows(&self) -> Result<RawTable, PipelineError> {
        let file = File::open(&self.path).map_err(|err| {
            PipelineError::Io(format!("failed to open {}: {}", self.path.display(), err))
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(file);

        let width = reader
            .headers()
            .map_err(|err| PipelineError::Io(format!("failed to read CSV header: {err}")))?
            .len();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|err| PipelineError::Io(format!("failed to parse CSV row: {err}")))?;
            let mut row: Vec<String> = record.iter().map(|cell| cell.to_string()).collect();
            while row.len() < width {
                row.push(String::new());
            }
            rows.push(row);
        }
        Ok(rows)
    }
}
