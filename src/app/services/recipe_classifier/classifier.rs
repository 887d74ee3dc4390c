//! Recipe classification driver

use super::grouping::{collapse_ranges, group_cycles};
use super::signature::cycle_signatures;
use crate::app::models::{RecipeStep, Record};
use crate::app::services::aggregator::resolve_labels;
use crate::config::{AggregationConfig, RecipeConfig, RecipeNaming};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Named cycle ranges and one protocol per group
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecipeReport {
    /// Group name to inclusive runs of consecutive cycles
    pub ranges: BTreeMap<String, Vec<(u32, u32)>>,
    /// Representative cycle to its protocol signature
    pub protocols: BTreeMap<u32, Vec<RecipeStep>>,
    /// Group name to representative cycle
    pub representatives: BTreeMap<String, u32>,
}

impl RecipeReport {
    pub fn recipe_count(&self) -> usize {
        self.ranges.len()
    }

    /// Protocol of a named group
    pub fn protocol(&self, name: &str) -> Option<&[RecipeStep]> {
        let cycle = self.representatives.get(name)?;
        self.protocols.get(cycle).map(Vec::as_slice)
    }

    /// Name of the group a cycle belongs to
    pub fn recipe_for_cycle(&self, cycle: u32) -> Option<&str> {
        self.ranges
            .iter()
            .find(|(_, runs)| runs.iter().any(|(start, end)| (*start..=*end).contains(&cycle)))
            .map(|(name, _)| name.as_str())
    }
}

/// Finds cycles that ran the same step protocol
#[derive(Debug, Clone, Default)]
pub struct RecipeClassifier {
    config: RecipeConfig,
    aggregation: AggregationConfig,
}

impl RecipeClassifier {
    pub fn new(config: RecipeConfig, aggregation: AggregationConfig) -> Self {
        Self {
            config,
            aggregation,
        }
    }

    fn group_name(&self, ordinal: usize, representative: u32) -> String {
        match self.config.naming {
            RecipeNaming::RepresentativeCycle => format!("{}-{}", self.config.prefix, representative),
            RecipeNaming::Sequential => format!("{}-{}", self.config.prefix, ordinal),
        }
    }

    /// Classify the cycles of a series
    ///
    /// # Arguments
    ///
    /// * `records` - Validated series
    ///
    /// # Returns
    ///
    /// Group names with their cycle ranges, and the protocol of each
    /// group's representative cycle
    pub fn classify(&self, records: &[Record]) -> RecipeReport {
        let labels = resolve_labels(records, &self.aggregation);
        let mut signatures = cycle_signatures(records, &labels);
        let groups = group_cycles(&signatures, self.config.tolerance);

        let mut report = RecipeReport::default();
        for (ordinal, group) in groups.iter().enumerate() {
            let name = self.group_name(ordinal + 1, group.representative);
            let ranges = collapse_ranges(&group.members);
            debug!("{}: cycles {:?}", name, ranges);

            if let Some(protocol) = signatures.remove(&group.representative) {
                report.protocols.insert(group.representative, protocol);
            }
            report.representatives.insert(name.clone(), group.representative);
            report.ranges.insert(name, ranges);
        }

        info!(
            "Classified {} cycles into {} recipes",
            groups.iter().map(|g| g.members.len()).sum::<usize>(),
            report.recipe_count()
        );
        report
    }
}
