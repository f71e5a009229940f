//! Real-estate towns dashboard: load a listings table, filter it by county,
//! bedroom price and commute time, and shape the result into charts.
//!
//! The UI-free core lives here so it can be driven from tests and the
//! headless `--summary` mode exactly as the desktop app drives it.

pub mod color;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
