//! Per-cycle protocol signatures

use crate::app::models::{RecipeStep, Record};
use crate::app::services::aggregator::{PolarityLabels, step_runs};
use crate::app::transforms::{approx_eq, round_to};
use std::collections::BTreeMap;

/// Signature of one contiguous step
///
/// The charge polarity reports its peak voltage, onset current and terminal
/// current. The discharge polarity reports its lowest voltage, onset current
/// and terminal voltage. Rest steps report how long they lasted; any other
/// state contributes its status alone.
pub fn step_signature(run: &[Record], labels: &PolarityLabels) -> Option<RecipeStep> {
    let (first, last) = (run.first()?, run.last()?);
    let status = first.status;
    let mut step = RecipeStep {
        status,
        voltage_v: 0.0,
        current_a: 0.0,
        rest_time_s: 0.0,
        cutoff_current_a: 0.0,
        cutoff_voltage_v: 0.0,
    };

    if status.is_rest() {
        step.rest_time_s = last.elapsed_time_s;
    }
    if Some(status) == labels.charge {
        let peak = run.iter().map(|r| r.voltage_v).fold(f64::NEG_INFINITY, f64::max);
        step.voltage_v = round_to(peak, 2);
        step.current_a = round_to(first.current_a, 2);
        step.cutoff_current_a = round_to(last.current_a, 2);
    } else if Some(status) == labels.discharge {
        let floor = run.iter().map(|r| r.voltage_v).fold(f64::INFINITY, f64::min);
        step.voltage_v = round_to(floor, 2);
        step.current_a = round_to(first.current_a, 2);
        step.cutoff_voltage_v = round_to(last.voltage_v, 2);
    }
    Some(step)
}

/// Signature of every cycle, keyed by cycle number
pub fn cycle_signatures(
    records: &[Record],
    labels: &PolarityLabels,
) -> BTreeMap<u32, Vec<RecipeStep>> {
    let mut signatures: BTreeMap<u32, Vec<RecipeStep>> = BTreeMap::new();
    for rows in records.chunk_by(|a, b| a.cycle == b.cycle) {
        let steps = signatures.entry(rows[0].cycle).or_default();
        steps.extend(
            step_runs(rows)
                .into_iter()
                .filter_map(|run| step_signature(run, labels)),
        );
    }
    signatures
}

/// True when two signatures have the same shape and states, and every
/// numeric field agrees within `tolerance`
pub fn signatures_match(a: &[RecipeStep], b: &[RecipeStep], tolerance: f64) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.status == y.status
                && [
                    (x.voltage_v, y.voltage_v),
                    (x.current_a, y.current_a),
                    (x.rest_time_s, y.rest_time_s),
                    (x.cutoff_current_a, y.cutoff_current_a),
                    (x.cutoff_voltage_v, y.cutoff_voltage_v),
                ]
                .iter()
                .all(|(p, q)| approx_eq(*p, *q, tolerance))
        })
}
