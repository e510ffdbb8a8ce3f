pub mod series_store;
pub mod table_source;
