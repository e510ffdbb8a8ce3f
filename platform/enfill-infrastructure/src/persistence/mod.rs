pub mod postgres_series;
