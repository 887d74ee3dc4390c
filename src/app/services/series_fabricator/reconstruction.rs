//! Derived-field reconstruction for rows with a rebuilt elapsed time

use crate::app::models::PartialRecord;
use crate::app::transforms::{back_fill_leading, forward_fill, interpolate_interior};
use crate::constants::SECONDS_PER_HOUR;
use chrono::{NaiveDateTime, TimeDelta, Timelike};

/// Interval from the previous row to each row, in seconds
///
/// A negative interval marks a step reset and is replaced by the interval
/// before it. The first row, and rows next to an unknown value, get `None`.
pub fn row_deltas(elapsed: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut deltas: Vec<Option<f64>> = Vec::with_capacity(elapsed.len());
    for i in 0..elapsed.len() {
        let delta = match (i.checked_sub(1).and_then(|p| elapsed[p]), elapsed[i]) {
            (Some(previous), Some(current)) if current - previous >= 0.0 => Some(current - previous),
            (Some(_), Some(_)) => deltas.last().copied().flatten(),
            _ => None,
        };
        deltas.push(delta);
    }
    deltas
}

fn seconds(delta_s: f64) -> TimeDelta {
    TimeDelta::milliseconds((delta_s * 1000.0).round() as i64)
}

fn round_to_second(timestamp: NaiveDateTime) -> NaiveDateTime {
    let truncated = timestamp.with_nanosecond(0).unwrap_or(timestamp);
    if timestamp.nanosecond() >= 500_000_000 {
        truncated + TimeDelta::seconds(1)
    } else {
        truncated
    }
}

/// Offset each missing timestamp from the nearest observed one
///
/// A missing row gets the last observed timestamp plus the sum of the row
/// intervals since it, rounded once. Rows ahead of the first observed
/// timestamp are offset backwards from it. An unknown interval breaks the
/// run until the next observed row.
pub fn fill_timestamps(rows: &mut [PartialRecord], deltas: &[Option<f64>]) {
    let Some(first) = rows.iter().position(|r| r.timestamp.is_some()) else {
        return;
    };

    let mut anchor: Option<(NaiveDateTime, f64)> = None;
    for j in first..rows.len() {
        if let Some(observed) = rows[j].timestamp {
            anchor = Some((observed, 0.0));
            continue;
        }
        anchor = match (anchor, deltas[j]) {
            (Some((observed, offset)), Some(delta)) => Some((observed, offset + delta)),
            _ => None,
        };
        if let Some((observed, offset)) = anchor {
            rows[j].timestamp = Some(round_to_second(observed + seconds(offset)));
        }
    }

    let observed = rows[first].timestamp;
    let mut offset = Some(0.0);
    for j in (0..first).rev() {
        offset = match (offset, deltas[j + 1]) {
            (Some(offset), Some(delta)) => Some(offset + delta),
            _ => None,
        };
        if let (Some(observed), Some(offset)) = (observed, offset) {
            rows[j].timestamp = Some(round_to_second(observed - seconds(offset)));
        }
    }
}

/// Accumulate capacity and energy across rebuilt rows
///
/// A rebuilt row at elapsed 0 opens a step and starts from zero. Any other
/// rebuilt row adds `|I| * dt / 3600` to the previous capacity, and that
/// increment times the row voltage to the previous energy. Rows at zero
/// current add nothing.
pub fn fill_counters(rows: &mut [PartialRecord], observed: &[bool], deltas: &[Option<f64>]) {
    for j in 0..rows.len() {
        if observed[j] {
            continue;
        }
        if rows[j].elapsed_time_s == Some(0.0) {
            rows[j].capacity_ah = Some(0.0);
            rows[j].energy_wh = Some(0.0);
            continue;
        }
        let Some(previous) = j.checked_sub(1).map(|p| &rows[p]) else {
            continue;
        };
        let (Some(capacity), Some(energy), Some(delta)) =
            (previous.capacity_ah, previous.energy_wh, deltas[j])
        else {
            continue;
        };

        let row = &mut rows[j];
        let increment = if row.current_a != 0.0 {
            row.current_a.abs() * delta / SECONDS_PER_HOUR
        } else {
            0.0
        };
        row.capacity_ah = Some(capacity + increment);
        row.energy_wh = Some(energy + increment * row.voltage_v);
    }
}

/// Fill cycle numbers and step states
///
/// Cycles are interpolated and floored inside gaps, back-filled at the
/// start and carried forward at the end. States are carried forward, then
/// back-filled at the start.
pub fn fill_cycle_and_status(rows: &mut [PartialRecord]) {
    let mut cycles: Vec<Option<f64>> = rows.iter().map(|r| r.cycle.map(f64::from)).collect();
    interpolate_interior(&mut cycles);
    forward_fill(&mut cycles);
    back_fill_leading(&mut cycles);

    let mut states: Vec<_> = rows.iter().map(|r| r.status).collect();
    forward_fill(&mut states);
    back_fill_leading(&mut states);

    for ((row, cycle), status) in rows.iter_mut().zip(cycles).zip(states) {
        if row.cycle.is_none() {
            row.cycle = cycle.map(|c| c.floor() as u32);
        }
        if row.status.is_none() {
            row.status = status;
        }
    }
}
