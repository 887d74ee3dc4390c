//! Split-stream decoding (producer software 8 and later)
//!
//! Three files share a 4096-byte header and 4096-byte blocks whose payload
//! starts at byte 132:
//!
//! - `data.ndc` holds `(voltage, current)` float pairs, one per sample
//! - `data_runInfo.ndc` holds elapsed time, cumulative counters, timestamp
//!   and raw step id per sample index, in one of two record lengths
//! - `data_step.ndc` holds cycle and status per logical step
//!
//! The run-info stream does not cover every sample, so the joined rows are
//! [`PartialRecord`]s that the series fabricator completes.

use super::layout::{read_f32, read_i8, read_i32};
use super::stats::DecodeStats;
use crate::app::models::{PartialRecord, StepState};
use crate::app::transforms::count_changes;
use crate::config::TimezoneConfig;
use crate::constants::split_stream as sp;
use crate::constants::{SPLIT_CURRENT_DIVISOR, VOLTAGE_DIVISOR};
use crate::{Error, Result};
use chrono::{DateTime, Duration, NaiveDateTime};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

// Run-info record fields
const RUN_ELAPSED_MS_AT: usize = 0;
const RUN_CHARGE_CAPACITY_AT: usize = 5;
const RUN_DISCHARGE_CAPACITY_AT: usize = 9;
const RUN_CHARGE_ENERGY_AT: usize = 13;
const RUN_DISCHARGE_ENERGY_AT: usize = 17;
const RUN_TIMESTAMP_AT: usize = 33;
const RUN_STEP_AT: usize = 37;
const RUN_INDEX_AT: usize = 41;

// Step-identity record fields
const STEP_CYCLE_AT: usize = 0;
const STEP_ID_AT: usize = 4;
const STEP_STATUS_AT: usize = 24;

/// One telemetry sample
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRow {
    pub index: u32,
    pub voltage_v: f64,
    pub current_a: f64,
}

/// One run-info sample
#[derive(Debug, Clone, PartialEq)]
pub struct RunInfoRow {
    pub index: u32,
    pub elapsed_time_s: f64,
    pub capacity_ah: f64,
    pub energy_wh: f64,
    pub timestamp: NaiveDateTime,
    /// Instrument step id, unique only within a cycle
    pub raw_step: i32,
    /// Monotonic logical step
    pub step: u32,
}

/// One step-identity row
#[derive(Debug, Clone, PartialEq)]
pub struct StepRow {
    pub step: u32,
    pub cycle: u32,
    pub status: StepState,
}

/// Run-info record geometry for a layout version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunInfoLayout {
    pub version: u8,
    pub record_len: usize,
    pub trailer: usize,
}

impl RunInfoLayout {
    /// Pick the geometry for a version byte
    pub fn for_version(version: u8) -> Result<Self> {
        if version < sp::MIN_SUPPORTED_VERSION {
            return Err(Error::unsupported_version(
                "run-info stream",
                version,
                sp::MIN_SUPPORTED_VERSION,
            ));
        }
        let (record_len, trailer) = if version >= sp::RUN_INFO_LONG_FROM {
            (sp::RUN_INFO_LONG_RECORD, sp::RUN_INFO_LONG_TRAILER)
        } else {
            (sp::RUN_INFO_SHORT_RECORD, sp::RUN_INFO_SHORT_TRAILER)
        };
        Ok(Self {
            version,
            record_len,
            trailer,
        })
    }
}

fn stream_version(bytes: &[u8], stream: &str) -> Result<u8> {
    bytes
        .get(sp::VERSION_AT)
        .copied()
        .ok_or_else(|| Error::record_decode(0, format!("{} has no version byte", stream)))
}

/// Record payload of every block after the file header
///
/// A short final block contributes whatever whole records it holds.
fn payloads(bytes: &[u8], trailer: usize) -> impl Iterator<Item = &[u8]> {
    bytes
        .get(sp::HEADER_LEN..)
        .unwrap_or_default()
        .chunks(sp::BLOCK_LEN)
        .filter_map(move |block| {
            let end = block.len().checked_sub(trailer)?;
            block.get(sp::PAYLOAD_START..end)
        })
}

/// Decode `data.ndc` voltage/current pairs
///
/// Pairs with a zero voltage are block padding. Row index is the 1-based
/// position among the kept pairs.
pub fn decode_telemetry(bytes: &[u8]) -> Vec<TelemetryRow> {
    let mut rows = Vec::new();
    for payload in payloads(bytes, sp::DATA_TRAILER) {
        for pair in payload.chunks_exact(8) {
            let voltage = read_f32(pair, 0);
            if voltage == 0.0 {
                continue;
            }
            let current = read_f32(pair, 4);
            rows.push(TelemetryRow {
                index: rows.len() as u32 + 1,
                voltage_v: f64::from(voltage) / VOLTAGE_DIVISOR,
                current_a: f64::from(current) / SPLIT_CURRENT_DIVISOR,
            });
        }
    }
    rows
}

/// Decode `data_runInfo.ndc`
///
/// # Arguments
///
/// * `bytes` - Whole stream, header included
/// * `timezone` - Offsets used to normalise the stored unix seconds
///
/// # Returns
///
/// Rows in stream order with their logical step assigned, or
/// `Error::UnsupportedVersion` for layouts older than version 11.
pub fn decode_run_info(bytes: &[u8], timezone: &TimezoneConfig) -> Result<Vec<RunInfoRow>> {
    let layout = RunInfoLayout::for_version(stream_version(bytes, "run-info stream")?)?;
    debug!(
        "Run-info layout v{}: {}-byte records",
        layout.version, layout.record_len
    );

    let shift = Duration::seconds(timezone.shift_seconds());
    let mut rows = Vec::new();
    for (block, payload) in payloads(bytes, layout.trailer).enumerate() {
        for (slot, record) in payload.chunks_exact(layout.record_len).enumerate() {
            let index = read_i32(record, RUN_INDEX_AT);
            if index == 0 {
                continue;
            }
            let offset = sp::HEADER_LEN
                + block * sp::BLOCK_LEN
                + sp::PAYLOAD_START
                + slot * layout.record_len;
            let index = u32::try_from(index).map_err(|_| {
                Error::record_decode(offset, format!("negative run-info index {}", index))
            })?;

            let seconds = read_i32(record, RUN_TIMESTAMP_AT);
            let timestamp = DateTime::from_timestamp(i64::from(seconds), 0)
                .map(|utc| utc.naive_utc() + shift)
                .ok_or_else(|| {
                    Error::record_decode(offset, format!("timestamp {} out of range", seconds))
                })?;

            let counter = |at: usize| f64::from(read_f32(record, at)) / sp::COUNTER_DIVISOR;
            rows.push(RunInfoRow {
                index,
                elapsed_time_s: f64::from(read_i32(record, RUN_ELAPSED_MS_AT)) / 1000.0,
                capacity_ah: (counter(RUN_CHARGE_CAPACITY_AT)
                    - counter(RUN_DISCHARGE_CAPACITY_AT))
                    .abs(),
                energy_wh: (counter(RUN_CHARGE_ENERGY_AT) - counter(RUN_DISCHARGE_ENERGY_AT))
                    .abs(),
                timestamp,
                raw_step: read_i32(record, RUN_STEP_AT),
                step: 0,
            });
        }
    }

    let raw_steps: Vec<i32> = rows.iter().map(|row| row.raw_step).collect();
    for (row, step) in rows.iter_mut().zip(count_changes(&raw_steps)) {
        row.step = step;
    }
    Ok(rows)
}

/// Decode `data_step.ndc`; the logical step is the 1-based row position
pub fn decode_steps(bytes: &[u8]) -> Result<Vec<StepRow>> {
    let version = stream_version(bytes, "step stream")?;
    if version < sp::MIN_SUPPORTED_VERSION {
        return Err(Error::unsupported_version(
            "step stream",
            version,
            sp::MIN_SUPPORTED_VERSION,
        ));
    }

    let mut rows = Vec::new();
    for payload in payloads(bytes, sp::STEP_TRAILER) {
        for record in payload.chunks_exact(sp::STEP_RECORD) {
            if read_i32(record, STEP_ID_AT) == 0 {
                continue;
            }
            let cycle = read_i32(record, STEP_CYCLE_AT).saturating_add(1).max(0) as u32;
            let status = StepState::from_code(i32::from(read_i8(record, STEP_STATUS_AT)))?;
            rows.push(StepRow {
                step: rows.len() as u32 + 1,
                cycle,
                status,
            });
        }
    }
    Ok(rows)
}

/// Left-join telemetry with run-info on index, forward-fill the step, then
/// left-join step identity on step
pub fn join_streams(
    telemetry: Vec<TelemetryRow>,
    run_info: &[RunInfoRow],
    steps: &[StepRow],
    keep_raw_step_id: bool,
) -> Vec<PartialRecord> {
    let mut run_by_index: HashMap<u32, &RunInfoRow> = HashMap::with_capacity(run_info.len());
    for row in run_info {
        run_by_index.entry(row.index).or_insert(row);
    }
    let step_by_number: HashMap<u32, &StepRow> =
        steps.iter().map(|row| (row.step, row)).collect();

    let mut current_step: Option<(u32, i32)> = None;
    telemetry
        .into_iter()
        .map(|sample| {
            let run = run_by_index.get(&sample.index).copied();
            if let Some(run) = run {
                current_step = Some((run.step, run.raw_step));
            }
            let step = current_step.map(|(step, _)| step);
            let identity = step.and_then(|step| step_by_number.get(&step).copied());

            PartialRecord {
                index: sample.index,
                voltage_v: sample.voltage_v,
                current_a: sample.current_a,
                cycle: identity.map(|row| row.cycle),
                step,
                status: identity.map(|row| row.status),
                elapsed_time_s: run.map(|row| row.elapsed_time_s),
                capacity_ah: run.map(|row| row.capacity_ah),
                energy_wh: run.map(|row| row.energy_wh),
                timestamp: run.map(|row| row.timestamp),
                step_number: if keep_raw_step_id {
                    current_step.and_then(|(_, raw)| u32::try_from(raw).ok())
                } else {
                    None
                },
            }
        })
        .collect()
}

/// Decoder for the three-file layout
#[derive(Debug, Clone, Default)]
pub struct SplitStreamDecoder {
    pub timezone: TimezoneConfig,
    pub keep_raw_step_id: bool,
}

/// Joined rows plus counters
#[derive(Debug, Clone, Default)]
pub struct SplitStreamOutput {
    pub rows: Vec<PartialRecord>,
    pub stats: DecodeStats,
}

impl SplitStreamDecoder {
    pub fn new(timezone: TimezoneConfig, keep_raw_step_id: bool) -> Self {
        Self {
            timezone,
            keep_raw_step_id,
        }
    }

    /// Read and decode the three stream files
    pub fn decode_files(
        &self,
        data: &Path,
        run_info: &Path,
        step: &Path,
    ) -> Result<SplitStreamOutput> {
        let read = |path: &Path| {
            fs::read(path).map_err(|e| Error::io(format!("Failed to read {}", path.display()), e))
        };
        self.decode_bytes(&read(data)?, &read(run_info)?, &read(step)?)
    }

    pub fn decode_bytes(
        &self,
        data: &[u8],
        run_info: &[u8],
        step: &[u8],
    ) -> Result<SplitStreamOutput> {
        let run_info = decode_run_info(run_info, &self.timezone)?;
        let steps = decode_steps(step)?;
        let telemetry = decode_telemetry(data);

        let mut stats = DecodeStats::new();
        stats.records_scanned = telemetry.len();

        let rows = join_streams(telemetry, &run_info, &steps, self.keep_raw_step_id);
        stats.records_decoded = rows.len();
        info!(
            "Split-stream decode: {} samples, {} run-info rows, {} steps",
            rows.len(),
            run_info.len(),
            steps.len()
        );

        Ok(SplitStreamOutput { rows, stats })
    }
}
