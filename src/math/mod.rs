//! Numeric helpers: z-score standardization.

pub mod standardize;

pub use standardize::*;
