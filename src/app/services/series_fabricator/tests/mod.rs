//! Tests for split-stream row reconstruction


use crate::app::models::{PartialRecord, StepState};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

/// Current giving 0.001 Ah per second
pub const CURRENT_A: f64 = 3.6;
pub const VOLTAGE_V: f64 = 4.0;

pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

pub fn at(seconds: i64) -> NaiveDateTime {
    base_time() + TimeDelta::seconds(seconds)
}

/// A row as the split-stream join produces it
///
/// `observed` is `Some((elapsed, capacity, seconds after base))` for rows
/// with run-info; `None` leaves time, counters and timestamp missing. The
/// energy of an observed row is its capacity times the fixture voltage.
pub fn row(
    index: u32,
    step: u32,
    status: StepState,
    observed: Option<(f64, f64, i64)>,
) -> PartialRecord {
    PartialRecord {
        index,
        voltage_v: VOLTAGE_V,
        current_a: CURRENT_A,
        cycle: Some(1),
        step: Some(step),
        status: Some(status),
        elapsed_time_s: observed.map(|(elapsed, _, _)| elapsed),
        capacity_ah: observed.map(|(_, capacity, _)| capacity),
        energy_wh: observed.map(|(_, capacity, _)| capacity * VOLTAGE_V),
        timestamp: observed.map(|(_, _, offset)| at(offset)),
        step_number: None,
    }
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}
