//! Core domain types and logic.

pub mod bar;
pub mod indicator;
pub mod extrema;
pub mod signal;
pub mod position;
pub mod portfolio;
pub mod execution;
pub mod backtest;
pub mod metrics;
pub mod sizing;
pub mod config_validation;
pub mod error;
