//! Individual validation checks
//!
//! The pre-pass functions clear `validated` on offending rows and return how
//! many they cleared. The invariant checks return the first failure found.

use super::report::ValidationFailure;
use crate::app::models::{Record, TestMetadata};
use crate::config::ValidationConfig;
use crate::constants::validation::CONTROL_CHAR_PATTERN;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

type CheckResult = std::result::Result<(), ValidationFailure>;

// =============================================================================
// Continuity Pre-pass
// =============================================================================

/// Clear rows whose elapsed-time step disagrees with their timestamp step
///
/// A row is flagged when it stays in the same step as the row before it, its
/// elapsed time is non-zero, and the two deltas differ by more than
/// `tolerance_s`. This marks power interruptions, which corrupt timing but
/// not the electrochemical values.
///
/// # Returns
///
/// Number of rows cleared
pub fn flag_timegaps(records: &mut [Record], tolerance_s: f64) -> usize {
    let mut flagged = 0;
    for i in 1..records.len() {
        let (previous, current) = (&records[i - 1], &records[i]);
        if current.step != previous.step || current.elapsed_time_s == 0.0 {
            continue;
        }
        let elapsed_delta = current.elapsed_time_s - previous.elapsed_time_s;
        let clock_delta =
            (current.timestamp - previous.timestamp).num_milliseconds() as f64 / 1000.0;
        if (elapsed_delta - clock_delta).abs() > tolerance_s {
            debug!(
                "Index {}: elapsed advanced {:.3}s but clock advanced {:.3}s",
                current.index, elapsed_delta, clock_delta
            );
            if records[i].validated {
                records[i].validated = false;
                flagged += 1;
            }
        }
    }
    flagged
}

/// Clear Rest rows that carry current after the step has started
pub fn flag_rest_current(records: &mut [Record]) -> usize {
    let mut flagged = 0;
    for record in records.iter_mut() {
        if record.status.is_rest()
            && record.current_a != 0.0
            && record.elapsed_time_s != 0.0
            && record.validated
        {
            record.validated = false;
            flagged += 1;
        }
    }
    flagged
}

// =============================================================================
// Structural Invariants
// =============================================================================

/// Index starts at 1 and rises strictly; cycle and step start at 1; steps never fall
pub fn check_structure(records: &[Record]) -> CheckResult {
    let Some(first) = records.first() else {
        return Err(ValidationFailure::Empty);
    };
    if first.index != 1 {
        return Err(ValidationFailure::IndexStart { first: first.index });
    }
    for pair in records.windows(2) {
        if pair[1].index <= pair[0].index {
            return Err(ValidationFailure::IndexNotIncreasing {
                previous: pair[0].index,
                index: pair[1].index,
            });
        }
    }

    let min_cycle = records.iter().map(|r| r.cycle).min().unwrap_or(1);
    if min_cycle != 1 {
        return Err(ValidationFailure::CycleStart { minimum: min_cycle });
    }
    let min_step = records.iter().map(|r| r.step).min().unwrap_or(1);
    if min_step != 1 {
        return Err(ValidationFailure::StepStart { minimum: min_step });
    }
    for pair in records.windows(2) {
        if pair[1].step < pair[0].step {
            return Err(ValidationFailure::StepDecreasing {
                index: pair[1].index,
                previous: pair[0].step,
                step: pair[1].step,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Physical Plausibility
// =============================================================================

/// Voltage floor, non-negative counters and nominal-capacity ceilings
///
/// Simulation steps are exempt from the voltage and sign checks.
pub fn check_physics(
    records: &[Record],
    config: &ValidationConfig,
    nominal_capacity_ah: f64,
) -> CheckResult {
    let measured = || records.iter().filter(|r| !r.status.is_simulation());

    if let Some(lowest) = measured().min_by(|a, b| a.voltage_v.total_cmp(&b.voltage_v)) {
        if lowest.voltage_v < config.min_voltage_v {
            return Err(ValidationFailure::VoltageTooLow {
                index: lowest.index,
                voltage_v: lowest.voltage_v,
                limit_v: config.min_voltage_v,
            });
        }
    }
    if let Some(record) = measured().find(|r| r.capacity_ah < 0.0) {
        return Err(ValidationFailure::NegativeCapacity {
            index: record.index,
        });
    }
    if let Some(record) = measured().find(|r| r.energy_wh < 0.0) {
        return Err(ValidationFailure::NegativeEnergy {
            index: record.index,
        });
    }

    let capacity_ceiling = config.capacity_ceiling_factor * nominal_capacity_ah;
    let maximum_capacity = records
        .iter()
        .map(|r| r.capacity_ah)
        .fold(f64::NEG_INFINITY, f64::max);
    if maximum_capacity > capacity_ceiling {
        return Err(ValidationFailure::CapacityCeiling {
            maximum_ah: maximum_capacity,
            ceiling_ah: capacity_ceiling,
        });
    }

    let current_ceiling = config.current_ceiling_factor * nominal_capacity_ah;
    let maximum_current = records
        .iter()
        .map(|r| r.current_a.abs())
        .fold(0.0, f64::max);
    if maximum_current > current_ceiling {
        return Err(ValidationFailure::CurrentCeiling {
            maximum_a: maximum_current,
            ceiling_a: current_ceiling,
        });
    }
    Ok(())
}

// =============================================================================
// Metadata
// =============================================================================

fn control_chars() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(CONTROL_CHAR_PATTERN).ok()).as_ref()
}

fn has_control_chars(text: &str) -> bool {
    match control_chars() {
        Some(pattern) => pattern.is_match(text),
        None => text.chars().any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r')),
    }
}

/// Free-text fields carry no control characters; the barcode has the expected length
///
/// Metadata that is not fully present is not checked.
pub fn check_metadata(metadata: &TestMetadata, barcode_len: usize) -> CheckResult {
    let (Some(process_name), Some(start_time), Some(barcode)) = (
        metadata.process_name.as_deref(),
        metadata.start_time.as_deref(),
        metadata.barcode.as_deref(),
    ) else {
        return Ok(());
    };

    for (field, value) in [
        ("process_name", process_name),
        ("start_time", start_time),
        ("barcode", barcode),
    ] {
        if has_control_chars(value) {
            return Err(ValidationFailure::ControlCharacters { field });
        }
    }

    let actual = barcode.chars().count();
    if actual != barcode_len {
        return Err(ValidationFailure::BarcodeLength {
            actual,
            expected: barcode_len,
        });
    }
    Ok(())
}
