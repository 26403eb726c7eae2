//! extrema-trader: moving-average extrema strategy, backtested and traded live.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], the streaming driver in [`live`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod live;
pub mod ports;
