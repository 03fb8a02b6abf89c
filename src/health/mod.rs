//! Health-based filtering of discovered service instances
//!
//! This module provides:
//! - A total order of health levels
//! - Min-aggregation of registry checks per node or per instance
//! - A server list filter keeping only the healthiest tier of candidates

mod aggregator;
mod filter;
mod level;

pub use aggregator::{index_by_min_health, HealthIndex};
pub use filter::{select_top, RankedServer, ServerListFilter, ServiceCheckFilter};
pub use level::HealthLevel;
