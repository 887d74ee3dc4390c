//! Reconstruction of incomplete split-stream rows
//!
//! The split-stream run-info file does not carry a row for every telemetry
//! sample. Rows without one arrive with voltage and current only; this module
//! rebuilds their elapsed time, timestamp, capacity, energy, cycle and state
//! so they join the common record schema.
//!
//! # Architecture
//!
//! - [`fabricator`] - Artifact repair and elapsed-time reconstruction
//! - [`reconstruction`] - Timestamps, counters, cycle and state fill
//!
//! Observed values are never rewritten. Running the fabricator on a series
//! that has nothing missing returns the same records.

pub mod fabricator;
pub mod reconstruction;

pub use fabricator::{FabricationOutcome, FabricationReport, SeriesFabricator};

#[cfg(test)]
pub mod tests;
