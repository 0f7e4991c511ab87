//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod default_config;
pub mod file_config_adapter;
pub mod markdown_report;
pub mod portfolio_csv_adapter;
