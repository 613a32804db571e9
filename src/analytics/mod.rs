//! Analytics module
//!
//! Pure computation of the derived read model.

pub mod engine;

pub use engine::compute_derived_metrics;
