//! Solar and battery savings projection: incentives, financing, 25-year cost
//! simulation and deal assessment, served over HTTP or run once from the CLI.

pub mod api;
pub mod core;
pub mod error;
