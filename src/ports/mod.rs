//! Port traits: the narrow contracts to external collaborators.

pub mod config_port;
pub mod market_data_port;
pub mod portfolio_port;
pub mod report_port;
