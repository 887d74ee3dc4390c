//! Step and cycle aggregation
//!
//! Reduces a validated series to one summary per contiguous step and one per
//! cycle. DCIR is derived once at current onsets and then read, never
//! recomputed, by the step summaries.
//!
//! # Architecture
//!
//! - [`dcir`] - DCIR derivation at zero-to-non-zero current transitions
//! - [`steps`] - Contiguous step runs and their summaries
//! - [`cycles`] - Polarity label resolution, cycle summaries, gap filtering

pub mod cycles;
pub mod dcir;
pub mod steps;

pub use cycles::{PolarityLabels, drop_cycles_with_index_gaps, resolve_labels, summarise_cycles};
pub use dcir::derive_dcir;
pub use steps::{step_runs, summarise_steps};

use crate::app::models::{CycleSummary, Record, StepSummary};
use crate::config::AggregationConfig;
use tracing::info;

/// Summarises a series with one aggregation configuration
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    config: AggregationConfig,
}

impl Aggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    /// One summary per contiguous step
    pub fn steps(&self, records: &[Record]) -> Vec<StepSummary> {
        let steps = summarise_steps(records);
        info!("Aggregated {} rows into {} steps", records.len(), steps.len());
        steps
    }

    /// One summary per cycle
    pub fn cycles(&self, records: &[Record]) -> Vec<CycleSummary> {
        let cycles = summarise_cycles(records, &self.config);
        info!(
            "Aggregated {} rows into {} cycles",
            records.len(),
            cycles.len()
        );
        cycles
    }
}

#[cfg(test)]
pub mod tests;
