//! Recipe classification
//!
//! Finds groups of cycles that ran the same step protocol. Each cycle is
//! reduced to a compact signature of its steps; signatures are compared
//! field by field within a tolerance, since the values come from noisy
//! measurements.
//!
//! # Architecture
//!
//! - [`signature`] - Per-step and per-cycle signatures, tolerant comparison
//! - [`grouping`] - Earliest-representative grouping and range collapsing
//! - [`classifier`] - Driver producing a [`RecipeReport`]

pub mod classifier;
pub mod grouping;
pub mod signature;

pub use classifier::{RecipeClassifier, RecipeReport};
pub use grouping::{CycleGroup, collapse_ranges, group_cycles};
pub use signature::{cycle_signatures, signatures_match, step_signature};

#[cfg(test)]
pub mod tests;
