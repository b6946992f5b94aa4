//! Budget allocation core.
//!
//! - schema/value validation (`validate`)
//! - proportional allocation + equal split (`allocator`)
//! - what-if overrides (`adjust`)
//! - channel filters and metric uplifts (`scenario`)
//!
//! Everything here is pure: explicit inputs in, new values out, no I/O.

pub mod adjust;
pub mod allocator;
pub mod error;
pub mod scenario;
pub mod validate;

pub use adjust::apply_overrides;
pub use allocator::{allocate, apply_weights, channel_sums, channel_weights, equal_channel_weights, equal_split};
pub use error::AllocError;
pub use scenario::{apply_uplift, filter_channels, resolve_channel};
pub use validate::{metric_values, require_columns};
