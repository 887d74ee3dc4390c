//! Single-stream `data.ndc` decoding
//!
//! The stream is a header followed by fixed-length records. Records are
//! located by scanning for a sync sequence copied from the header; the
//! header also tells which of the two record lengths is in use. Each hit is
//! classified by its marker byte as a primary telemetry record, an auxiliary
//! record, or noise.

use super::aux_channel;
use super::layout::{
    current_multiplier, find_from, read_i32, read_i64, read_packed_datetime, read_u8, read_u32,
    read_u64,
};
use super::stats::DecodeStats;
use crate::app::models::{AuxRecord, Record, StepState};
use crate::app::transforms::count_changes;
use crate::constants::single_stream as ss;
use crate::constants::{MIN_DECODE_VOLTAGE_V, SECONDS_PER_HOUR, VOLTAGE_DIVISOR};
use crate::{Error, Result};
use memmap2::MmapOptions;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Record geometry detected from the stream header
#[derive(Debug, Clone, PartialEq)]
pub struct SingleStreamLayout {
    pub record_len: usize,
    pub sync: Vec<u8>,
    /// Distance from a sync hit back to the record start
    pub sync_offset: usize,
    pub primary_marker_at: usize,
    pub aux_marker_at: usize,
}

impl SingleStreamLayout {
    /// Inspect the header and pick the record geometry
    pub fn detect(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ss::LAYOUT_PROBE.end {
            return Err(Error::record_decode(
                0,
                format!("stream of {} bytes is shorter than its header", bytes.len()),
            ));
        }

        let probe = &bytes[ss::LAYOUT_PROBE];
        if probe.iter().any(|b| *b != 0) {
            return Ok(Self {
                record_len: ss::LONG_RECORD_LEN,
                sync: probe.to_vec(),
                sync_offset: 0,
                primary_marker_at: 0,
                aux_marker_at: 0,
            });
        }

        if bytes.len() < ss::SHORT_SYNC.end {
            return Err(Error::record_decode(
                0,
                "stream too short to hold the 90-byte layout sync sequence",
            ));
        }
        Ok(Self {
            record_len: ss::SHORT_RECORD_LEN,
            sync: bytes[ss::SHORT_SYNC].to_vec(),
            sync_offset: ss::SHORT_SYNC_OFFSET,
            primary_marker_at: ss::SHORT_PRIMARY_MARKER_AT,
            aux_marker_at: ss::SHORT_AUX_MARKER_AT,
        })
    }
}

/// What became of one primary record
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryOutcome {
    Decoded(Record),
    /// Status byte 0 or 255: an unused slot
    InvalidStatus,
    /// Failed the index/cycle/step/voltage sanity check
    Rejected,
}

/// Decode one primary record
///
/// Unknown status codes, unknown current ranges and impossible dates are
/// fatal: a misread layout must not produce plausible-looking numbers.
///
/// # Arguments
///
/// * `record` - Exactly one record, starting at its first byte
/// * `offset` - Absolute position of the record, for error context
pub fn decode_primary(record: &[u8], offset: usize) -> Result<PrimaryOutcome> {
    let status_code = read_u8(record, ss::STATUS_AT);
    if status_code == ss::EMPTY_STATUS || status_code == ss::FILLER_STATUS {
        return Ok(PrimaryOutcome::InvalidStatus);
    }
    let status = StepState::from_code(i32::from(status_code))?;

    let index = read_u32(record, ss::INDEX_AT);
    let cycle = read_u32(record, ss::CYCLE_AT).saturating_add(1);
    let step = u32::from(read_u8(record, ss::STEP_AT));
    let elapsed_ms = read_u64(record, ss::ELAPSED_MS_AT);
    let voltage_raw = read_i32(record, ss::VOLTAGE_AT);
    let current_raw = read_i32(record, ss::CURRENT_AT);
    let charge_capacity = read_i64(record, ss::CHARGE_CAPACITY_AT);
    let discharge_capacity = read_i64(record, ss::DISCHARGE_CAPACITY_AT);
    let charge_energy = read_i64(record, ss::CHARGE_ENERGY_AT);
    let discharge_energy = read_i64(record, ss::DISCHARGE_ENERGY_AT);
    let timestamp = read_packed_datetime(record, ss::DATE_AT, offset)?;
    let multiplier = current_multiplier(read_i32(record, ss::RANGE_AT))?;

    let voltage_v = f64::from(voltage_raw) / VOLTAGE_DIVISOR;
    if index < 1 || cycle < 1 || step < 1 || voltage_v < MIN_DECODE_VOLTAGE_V {
        return Ok(PrimaryOutcome::Rejected);
    }

    let capacity_raw = charge_capacity.abs_diff(discharge_capacity) as f64;
    let energy_raw = charge_energy.abs_diff(discharge_energy) as f64;

    Ok(PrimaryOutcome::Decoded(Record {
        index,
        cycle,
        step,
        status,
        elapsed_time_s: elapsed_ms as f64 / 1000.0,
        voltage_v,
        current_a: f64::from(current_raw) * multiplier,
        capacity_ah: capacity_raw * multiplier / SECONDS_PER_HOUR,
        energy_wh: energy_raw * multiplier / SECONDS_PER_HOUR,
        timestamp,
        validated: true,
        dcir_mohm: None,
        aux_temperature_c: None,
        step_number: None,
    }))
}

/// Output of a single-stream decode, before the auxiliary join
#[derive(Debug, Clone, Default)]
pub struct SingleStreamOutput {
    pub records: Vec<Record>,
    pub aux: Vec<AuxRecord>,
    pub stats: DecodeStats,
}

/// Decoder for the consolidated `data.ndc` stream
#[derive(Debug, Clone, Default)]
pub struct SingleStreamDecoder {
    pub include_aux: bool,
    pub keep_raw_step_id: bool,
}

impl SingleStreamDecoder {
    pub fn new(include_aux: bool, keep_raw_step_id: bool) -> Self {
        Self {
            include_aux,
            keep_raw_step_id,
        }
    }

    /// Memory-map and decode a stream file
    pub fn decode_file(&self, path: &Path) -> Result<SingleStreamOutput> {
        let file = File::open(path)
            .map_err(|e| Error::io(format!("Failed to open {}", path.display()), e))?;
        let len = file
            .metadata()
            .map_err(|e| Error::io(format!("Failed to stat {}", path.display()), e))?
            .len();
        if len == 0 {
            return Err(Error::record_decode(0, "data stream is empty"));
        }

        // SAFETY: the file sits in this decode call's private working area and
        // nothing writes to it while the mapping is alive.
        let mmap = unsafe {
            MmapOptions::new()
                .map(&file)
                .map_err(|e| Error::io(format!("Failed to map {}", path.display()), e))?
        };
        self.decode_bytes(&mmap)
    }

    /// Scan and decode an in-memory stream
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<SingleStreamOutput> {
        let layout = SingleStreamLayout::detect(bytes)?;
        debug!(
            "Single-stream layout: {}-byte records, sync {:02x?}",
            layout.record_len, layout.sync
        );

        let mut stats = DecodeStats::new();
        let mut records = Vec::new();
        let mut aux = Vec::new();
        let mut search_from = 0;

        while let Some(hit) = find_from(bytes, &layout.sync, search_from) {
            let Some(start) = hit.checked_sub(layout.sync_offset) else {
                search_from = hit + 1;
                continue;
            };
            let end = start + layout.record_len;
            if end > bytes.len() {
                debug!("Truncated trailing record at byte {}", start);
                break;
            }
            let record = &bytes[start..end];
            stats.records_scanned += 1;

            let primary_marker = record[layout.primary_marker_at];
            let aux_marker = record[layout.aux_marker_at];
            let is_primary = primary_marker == ss::PRIMARY_MARKER;
            let is_aux = aux_marker == ss::AUX_MARKER_VT || aux_marker == ss::AUX_MARKER_VTT;

            // In the 90-byte layout the two markers sit at different bytes, so
            // one record can carry both.
            if is_primary {
                match decode_primary(record, start)? {
                    PrimaryOutcome::Decoded(row) => records.push(row),
                    PrimaryOutcome::InvalidStatus => stats.invalid_status += 1,
                    PrimaryOutcome::Rejected => {
                        debug!("Pre-check rejected record at byte {}", start);
                        stats.precheck_rejected += 1;
                    }
                }
            }
            if is_aux && self.include_aux {
                if let Some(row) = aux_channel::decode_aux(record, aux_marker) {
                    aux.push(row);
                    stats.aux_decoded += 1;
                }
            }
            if !is_primary && !is_aux {
                warn!(
                    "Unknown record type {:#04x} at byte {}, skipping",
                    primary_marker, start
                );
                stats.unknown_markers += 1;
            }

            search_from = end;
        }

        let records = self.finish(records, &mut stats);
        stats.records_decoded = records.len();
        info!("{}", stats.summary());

        Ok(SingleStreamOutput {
            records,
            aux,
            stats,
        })
    }

    /// De-duplicate, order by index and renumber steps
    fn finish(&self, records: Vec<Record>, stats: &mut DecodeStats) -> Vec<Record> {
        let decoded = records.len();
        let mut seen = HashSet::with_capacity(decoded);
        let mut records: Vec<Record> = records
            .into_iter()
            .filter(|record| seen.insert(record.index))
            .collect();
        stats.duplicates = decoded - records.len();

        if !records.windows(2).all(|pair| pair[0].index < pair[1].index) {
            records.sort_by_key(|record| record.index);
        }

        let raw_steps: Vec<u32> = records.iter().map(|record| record.step).collect();
        let steps = count_changes(&raw_steps);
        for (record, (step, raw)) in records.iter_mut().zip(steps.into_iter().zip(raw_steps)) {
            record.step = step;
            if self.keep_raw_step_id {
                record.step_number = Some(raw);
            }
        }
        records
    }
}
