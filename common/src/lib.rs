pub mod config;
pub mod index;
pub mod label;
pub mod metric;
pub mod plot;
pub mod table;
