//! Step-level summaries

use crate::app::models::{Record, StepSummary};

/// Split a series into contiguous runs of one step
pub fn step_runs(records: &[Record]) -> Vec<&[Record]> {
    records.chunk_by(|a, b| a.step == b.step).collect()
}

/// Summarise one run of rows sharing a step
///
/// Onset fields come from the first row, terminal fields from the last, and
/// the DCIR is read from the first row.
pub fn summarise_step(run: &[Record]) -> Option<StepSummary> {
    let (first, last) = (run.first()?, run.last()?);
    let (min_voltage_v, max_voltage_v) = run.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(low, high), r| (low.min(r.voltage_v), high.max(r.voltage_v)),
    );

    Some(StepSummary {
        cycle: first.cycle,
        step: first.step,
        step_type: first.status,
        duration_s: last.elapsed_time_s,
        start_time: first.timestamp,
        end_time: last.timestamp,
        start_voltage_v: first.voltage_v,
        end_voltage_v: last.voltage_v,
        start_current_a: first.current_a,
        end_current_a: last.current_a,
        capacity_ah: last.capacity_ah,
        energy_wh: last.energy_wh,
        min_voltage_v,
        max_voltage_v,
        dcir_mohm: first.dcir_mohm,
    })
}

/// Summaries for every step in the series, in order
pub fn summarise_steps(records: &[Record]) -> Vec<StepSummary> {
    step_runs(records)
        .into_iter()
        .filter_map(summarise_step)
        .collect()
}
