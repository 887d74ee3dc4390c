//! Cycle-level summaries and cycle filtering

use crate::app::models::{CycleSummary, PolaritySummary, Record, StepState};
use crate::config::AggregationConfig;
use crate::constants::{CHARGE_LABEL_PATTERN, DISCHARGE_LABEL_PATTERN};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

// =============================================================================
// Label Resolution
// =============================================================================

/// Step states treated as the charge and discharge polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolarityLabels {
    pub charge: Option<StepState>,
    pub discharge: Option<StepState>,
}

fn pattern(cell: &'static OnceLock<Option<Regex>>, source: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(source).ok()).as_ref()
}

fn is_charge_name(name: &str) -> bool {
    static CHARGE: OnceLock<Option<Regex>> = OnceLock::new();
    let matches = match pattern(&CHARGE, CHARGE_LABEL_PATTERN) {
        Some(re) => re.is_match(name),
        None => name.to_lowercase().contains("chg"),
    };
    matches && !name.to_lowercase().contains('d')
}

fn is_discharge_name(name: &str) -> bool {
    static DISCHARGE: OnceLock<Option<Regex>> = OnceLock::new();
    match pattern(&DISCHARGE, DISCHARGE_LABEL_PATTERN) {
        Some(re) => re.is_match(name),
        None => name.to_lowercase().contains("dchg"),
    }
}

/// Pick the charge and discharge states present in a series
///
/// The configured labels win when present. Otherwise the first state, in
/// order of appearance, whose name looks like a charge (`chg` without `d`)
/// or a discharge (`dchg`) is used.
pub fn resolve_labels(records: &[Record], config: &AggregationConfig) -> PolarityLabels {
    let mut present: Vec<StepState> = Vec::new();
    for record in records {
        if !present.contains(&record.status) {
            present.push(record.status);
        }
    }
    let named = |label: &str| present.iter().copied().find(|s| s.name() == label);

    let labels = PolarityLabels {
        charge: named(&config.charge_label)
            .or_else(|| present.iter().copied().find(|s| is_charge_name(s.name()))),
        discharge: named(&config.discharge_label)
            .or_else(|| present.iter().copied().find(|s| is_discharge_name(s.name()))),
    };
    debug!(
        "Polarity labels: charge {:?}, discharge {:?}",
        labels.charge, labels.discharge
    );
    labels
}

// =============================================================================
// Cycle Summaries
// =============================================================================

fn summarise_polarity(rows: &[&Record], state: Option<StepState>) -> Option<PolaritySummary> {
    let state = state?;
    let mut polarity = rows.iter().filter(|r| r.status == state);
    let first = *polarity.next()?;
    let last = polarity.last().copied().unwrap_or(first);

    Some(PolaritySummary {
        capacity_ah: last.capacity_ah,
        energy_wh: last.energy_wh,
        duration_s: last.elapsed_time_s,
        onset_voltage_v: first.voltage_v,
        terminal_voltage_v: last.voltage_v,
        onset_current_a: first.current_a,
        terminal_current_a: last.current_a,
    })
}

fn average_dcir(rows: &[&Record]) -> Option<f64> {
    let values: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.dcir_mohm)
        .filter(|d| *d > 0.0)
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Rows of each cycle, keyed by cycle number
pub fn rows_by_cycle(records: &[Record]) -> BTreeMap<u32, Vec<&Record>> {
    let mut cycles: BTreeMap<u32, Vec<&Record>> = BTreeMap::new();
    for record in records {
        cycles.entry(record.cycle).or_default().push(record);
    }
    cycles
}

/// Most common row count per cycle; ties go to the smaller count
fn modal_row_count(cycles: &BTreeMap<u32, Vec<&Record>>) -> Option<usize> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for rows in cycles.values() {
        *counts.entry(rows.len()).or_default() += 1;
    }
    let mut best: Option<(usize, usize)> = None;
    for (len, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((len, count));
        }
    }
    best.map(|(len, _)| len)
}

/// Summarise every cycle
///
/// A cycle without rows of one polarity reports `None` for it; aggregation
/// of the other cycles carries on.
///
/// # Arguments
///
/// * `records` - Validated series
/// * `config` - Polarity labels and last-cycle handling
pub fn summarise_cycles(records: &[Record], config: &AggregationConfig) -> Vec<CycleSummary> {
    let labels = resolve_labels(records, config);
    let mut cycles = rows_by_cycle(records);

    if config.drop_incomplete_last_cycle {
        let modal = modal_row_count(&cycles);
        if let Some((&last, rows)) = cycles.last_key_value() {
            if Some(rows.len()) != modal {
                info!(
                    "Last cycle {} has {} rows (modal {:?}); treating it as incomplete",
                    last,
                    rows.len(),
                    modal
                );
                cycles.remove(&last);
            }
        }
    }

    cycles
        .into_iter()
        .filter_map(|(cycle, rows)| {
            let (first, last) = (rows.first()?, rows.last()?);
            Some(CycleSummary {
                cycle,
                start_time: first.timestamp,
                end_time: last.timestamp,
                charge: summarise_polarity(&rows, labels.charge),
                discharge: summarise_polarity(&rows, labels.discharge),
                average_dcir_mohm: average_dcir(&rows),
            })
        })
        .collect()
}

// =============================================================================
// Index Gap Filtering
// =============================================================================

/// Remove cycles touched by a gap in the index
///
/// For each index jump, the cycle of the row after the jump and the nearest
/// earlier cycle present are removed.
///
/// # Returns
///
/// Remaining rows and the removed cycle numbers
pub fn drop_cycles_with_index_gaps(records: Vec<Record>) -> (Vec<Record>, BTreeSet<u32>) {
    let present: BTreeSet<u32> = records.iter().map(|r| r.cycle).collect();
    let mut dropped: BTreeSet<u32> = BTreeSet::new();

    for pair in records.windows(2) {
        if pair[1].index > pair[0].index + 1 {
            let cycle = pair[1].cycle;
            dropped.insert(cycle);
            if let Some(&previous) = present.range(..cycle).next_back() {
                dropped.insert(previous);
            }
        }
    }

    if dropped.is_empty() {
        return (records, dropped);
    }

    let before = records.len();
    let kept: Vec<Record> = records
        .into_iter()
        .filter(|r| !dropped.contains(&r.cycle))
        .collect();
    warn!(
        "Index gaps: dropped cycles {:?} ({} rows)",
        dropped,
        before - kept.len()
    );
    (kept, dropped)
}
