//! Artifact repair and elapsed-time reconstruction

use super::reconstruction::{fill_counters, fill_cycle_and_status, fill_timestamps, row_deltas};
use crate::app::models::{PartialRecord, Record};
use crate::app::transforms::{approx_eq, forward_fill, interpolate_interior, modal_delta, round_to};
use tracing::{debug, info, warn};

/// Tolerance when comparing an elapsed value with the modal interval (seconds)
const MODAL_TOLERANCE_S: f64 = 0.0005;

/// What the fabricator changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FabricationReport {
    /// Most frequent sampling interval, when one exists
    pub modal_delta_s: Option<f64>,
    /// Missing rows that open a step and were set to elapsed 0
    pub openers: usize,
    /// Missing rows following an elapsed-0 row, set to the modal interval
    pub followers: usize,
    pub interpolated: usize,
    pub extrapolated: usize,
    /// Rows whose elapsed time was missing on input and present on output
    pub fabricated_rows: usize,
    /// Rows that could not be completed and were dropped
    pub dropped_rows: usize,
}

impl FabricationReport {
    pub fn summary(&self) -> String {
        format!(
            "Fabrication Summary: {} rows fabricated (modal interval {}) | \
             Openers: {} | Followers: {} | Interpolated: {} | Extrapolated: {} | Dropped: {}",
            self.fabricated_rows,
            self.modal_delta_s
                .map(|d| format!("{:.3}s", d))
                .unwrap_or_else(|| "n/a".to_string()),
            self.openers,
            self.followers,
            self.interpolated,
            self.extrapolated,
            self.dropped_rows
        )
    }
}

/// Completed records plus the report
#[derive(Debug, Clone)]
pub struct FabricationOutcome {
    pub records: Vec<Record>,
    pub report: FabricationReport,
}

/// Fills the fields a split-stream run-info stream omitted
///
/// Only rows whose elapsed time is missing are touched; observed values are
/// never rewritten, so a complete series passes through unchanged.
#[derive(Debug, Clone, Default)]
pub struct SeriesFabricator;

impl SeriesFabricator {
    pub fn new() -> Self {
        Self
    }

    /// Complete a partial series
    ///
    /// # Arguments
    ///
    /// * `rows` - Joined rows in index order
    ///
    /// # Returns
    ///
    /// Records for every row that could be completed, and a report of what
    /// was filled and dropped
    pub fn fabricate(&self, mut rows: Vec<PartialRecord>) -> FabricationOutcome {
        let mut report = FabricationReport::default();
        let observed: Vec<bool> = rows.iter().map(|r| r.elapsed_time_s.is_some()).collect();
        let missing = observed.iter().filter(|o| !**o).count();

        if missing > 0 {
            warn!(
                "{} of {} rows lack run-info; time, capacity and energy for those rows are reconstructed",
                missing,
                rows.len()
            );

            let original: Vec<Option<f64>> = rows.iter().map(|r| r.elapsed_time_s).collect();
            report.modal_delta_s = modal_delta(&original);
            if let Some(modal) = report.modal_delta_s {
                repair_artifacts(&mut rows, &original, modal, &mut report);
            }

            let mut elapsed: Vec<Option<f64>> = rows.iter().map(|r| r.elapsed_time_s).collect();
            report.interpolated = interpolate_within_steps(&rows, &mut elapsed);
            report.extrapolated = extrapolate_forward(&mut elapsed);

            for ((row, value), was_observed) in rows.iter_mut().zip(&elapsed).zip(&observed) {
                if !was_observed {
                    row.elapsed_time_s = value.map(|e| round_to(e, 2));
                }
            }

            let elapsed: Vec<Option<f64>> = rows.iter().map(|r| r.elapsed_time_s).collect();
            let deltas = row_deltas(&elapsed);
            fill_timestamps(&mut rows, &deltas);
            fill_counters(&mut rows, &observed, &deltas);
            report.fabricated_rows = rows
                .iter()
                .zip(&observed)
                .filter(|(row, was_observed)| !**was_observed && row.elapsed_time_s.is_some())
                .count();
        }

        fill_cycle_and_status(&mut rows);

        let total = rows.len();
        let records: Vec<Record> = rows.into_iter().filter_map(PartialRecord::into_record).collect();
        report.dropped_rows = total - records.len();
        if report.dropped_rows > 0 {
            warn!(
                "Dropped {} rows that could not be reconstructed",
                report.dropped_rows
            );
        }

        if missing > 0 {
            info!("{}", report.summary());
        } else {
            debug!("Series complete, nothing to fabricate");
        }

        FabricationOutcome { records, report }
    }
}

/// Normalise the substitution artifacts around step boundaries
///
/// An opener is a missing row followed by a row at the modal interval: it is
/// the first sample of that step, so it takes the next row's identity and
/// elapsed 0. A follower is a missing row right after an elapsed-0 row: it is
/// the step's second sample, at the modal interval. Both are detected on the
/// unmodified elapsed column.
fn repair_artifacts(
    rows: &mut [PartialRecord],
    original: &[Option<f64>],
    modal: f64,
    report: &mut FabricationReport,
) {
    let n = rows.len();
    let is_follower = |i: usize| i > 0 && original[i].is_none() && original[i - 1] == Some(0.0);

    let openers: Vec<usize> = (0..n.saturating_sub(1))
        .filter(|&i| {
            original[i].is_none()
                && !is_follower(i)
                && original[i + 1].is_some_and(|next| approx_eq(next, modal, MODAL_TOLERANCE_S))
        })
        .collect();
    let followers: Vec<usize> = (1..n).filter(|&i| is_follower(i)).collect();

    for &i in &openers {
        let (cycle, step, status, step_number) = {
            let next = &rows[i + 1];
            (next.cycle, next.step, next.status, next.step_number)
        };
        let row = &mut rows[i];
        row.cycle = cycle.or(row.cycle);
        row.step = step.or(row.step);
        row.status = status.or(row.status);
        row.step_number = step_number.or(row.step_number);
        row.elapsed_time_s = Some(0.0);
    }
    for &i in &followers {
        rows[i].elapsed_time_s = Some(modal);
    }

    report.openers = openers.len();
    report.followers = followers.len();
    debug!(
        "Artifact repair: {} openers, {} followers at modal interval {}s",
        report.openers, report.followers, modal
    );
}

/// Linear interpolation inside each contiguous run of one step
fn interpolate_within_steps(rows: &[PartialRecord], elapsed: &mut [Option<f64>]) -> usize {
    let mut filled = 0;
    let mut start = 0;
    while start < rows.len() {
        let step = rows[start].step;
        let mut end = start + 1;
        while end < rows.len() && rows[end].step == step {
            end += 1;
        }
        if step.is_some() {
            filled += interpolate_interior(&mut elapsed[start..end]);
        }
        start = end;
    }
    filled
}

/// Extend each known value across the gap that follows it
///
/// A missing row `j` after the last known row `k` becomes
/// `e[k] + (j - k) * d`, where `d` is the most recent known interval at `k`.
fn extrapolate_forward(elapsed: &mut [Option<f64>]) -> usize {
    let snapshot = elapsed.to_vec();
    let mut intervals: Vec<Option<f64>> = (0..snapshot.len())
        .map(|i| match (i.checked_sub(1).and_then(|p| snapshot[p]), snapshot[i]) {
            (Some(previous), Some(current)) => Some(current - previous),
            _ => None,
        })
        .collect();
    forward_fill(&mut intervals);

    let mut filled = 0;
    let mut anchor: Option<usize> = None;
    for j in 0..snapshot.len() {
        if snapshot[j].is_some() {
            anchor = Some(j);
            continue;
        }
        let Some(k) = anchor else { continue };
        if let (Some(base), Some(interval)) = (snapshot[k], intervals[k]) {
            elapsed[j] = Some(base + (j - k) as f64 * interval);
            filled += 1;
        }
    }
    filled
}
