//! Terminal plots.

pub mod bars;

pub use bars::render_allocation_bars;
