pub mod output;
pub mod persistence;
pub mod tables;
