//! Core domain types and logic.

pub mod fundamentals;
pub mod market;
pub mod normalizer;
pub mod criteria_parser;
pub mod preset;
pub mod scorer;
pub mod ranker;
pub mod holding;
pub mod scenario;
pub mod stress;
pub mod batch;
pub mod universe;
pub mod config_validation;
pub mod error;
