//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - column identifiers (`Metric`, `Column`)
//! - observed rows and tables (`PerformanceRecord`, `Dataset`)
//! - derived values (`WeightMap`, `AllocationResult`)
//! - run settings (`AllocConfig`, `Uplift`, `DataSource`)

pub mod types;

pub use types::*;
