//! Grouping of cycles that ran the same protocol

use super::signature::signatures_match;
use crate::app::models::RecipeStep;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound::{Excluded, Unbounded};

/// Cycles sharing one protocol, led by the earliest of them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleGroup {
    pub representative: u32,
    /// All cycles of the group in ascending order, representative included
    pub members: Vec<u32>,
}

/// Group cycles by signature
///
/// Cycles are visited in ascending order. A cycle not yet assigned starts a
/// group, and every later unassigned cycle matching it joins that group. The
/// earliest cycle therefore always represents its group.
pub fn group_cycles(
    signatures: &BTreeMap<u32, Vec<RecipeStep>>,
    tolerance: f64,
) -> Vec<CycleGroup> {
    let mut assigned: BTreeSet<u32> = BTreeSet::new();
    let mut groups = Vec::new();

    for (&representative, signature) in signatures {
        if !assigned.insert(representative) {
            continue;
        }
        let mut members = vec![representative];
        for (&candidate, other) in signatures.range((Excluded(representative), Unbounded)) {
            if !assigned.contains(&candidate) && signatures_match(signature, other, tolerance) {
                assigned.insert(candidate);
                members.push(candidate);
            }
        }
        groups.push(CycleGroup {
            representative,
            members,
        });
    }
    groups
}

/// Collapse ascending cycle numbers into inclusive runs of consecutive values
///
/// `[1, 2, 3, 6, 7, 9]` becomes `[(1, 3), (6, 7), (9, 9)]`.
pub fn collapse_ranges(cycles: &[u32]) -> Vec<(u32, u32)> {
    let mut ranges: Vec<(u32, u32)> = Vec::new();
    for &cycle in cycles {
        match ranges.last_mut() {
            Some((_, end)) if end.checked_add(1) == Some(cycle) => *end = cycle,
            _ => ranges.push((cycle, cycle)),
        }
    }
    ranges
}
