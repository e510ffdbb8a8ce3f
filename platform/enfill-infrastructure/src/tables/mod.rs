pub mod csv;
pub mod xlsx;

use enfill_domain::errors::PipelineError;
use enfill_domain::repositories::table_source::TableSource;
use std::path::Path;

/// Picks the adapter for a path by extension. Anything other than `.csv` or
/// `.xlsx` is rejected here, before the file is touched.
pub fn open_table(path: &Path) -> Result<Box<dyn TableSource>, PipelineError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();
    match extension.as_str() {
        "csv" => Ok(Box::new(csv::CsvTable::new(path.to_path_buf()))),
        "xlsx" => Ok(Box::new(xlsx::XlsxTable::new(path.to_path_buf()))),
        _ => Err(PipelineError::UnsupportedFormat(
            path.display().to_string(),
        )),
    }
}
