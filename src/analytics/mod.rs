//! All-time aggregation: per-user accumulation, ranking, time series,
//! rolling averages, and the cached report loader.

pub mod aggregate;
pub mod loader;
pub mod rolling;
pub mod types;
