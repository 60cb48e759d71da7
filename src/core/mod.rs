//! Core matching engine modules.

pub mod dates;
pub mod matcher;
pub mod metric;
pub mod metrics;
pub mod normalize;
pub mod pattern;
pub mod sxe;
