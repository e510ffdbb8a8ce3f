use crate::errors::PipelineError;

/// Raw tabular rows as delivered by a format adapter. The header row is
/// already stripped; every row has the header's width, with empty strings
/// standing in for absent cells.
pub type RawTable = Vec<Vec<String>>;

/// Port for anything that can produce a raw table (CSV file, XLSX sheet).
pub trait TableSource: std::fmt::Debug {
    fn read_rows(&self) -> Result<RawTable, PipelineError>;
}
