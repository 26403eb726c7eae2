//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_report_adapter;
pub mod file_config_adapter;
pub mod log_notifier;
pub mod paper_venue;
#[cfg(feature = "pushover")]
pub mod pushover_notifier;
pub mod state_store;
