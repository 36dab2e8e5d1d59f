//! Concrete adapter implementations for ports.

pub mod csv_export;
pub mod extract_source;
pub mod file_config_adapter;
pub mod xlsx_export;
