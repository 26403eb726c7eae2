//! Port traits (interfaces) for the hexagonal architecture.

pub mod broker_port;
pub mod config_port;
pub mod data_port;
pub mod market_port;
pub mod notify_port;
pub mod report_port;
