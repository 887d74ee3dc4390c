//! Tests for binary record decoding
//!
//! Streams are assembled byte-for-byte from the layouts the decoders read,
//! so no instrument files are needed.

pub mod split_stream_tests;

use crate::constants::single_stream as ss;
use crate::constants::split_stream as sp;

/// Sync sequence used for 94-byte records (marker byte first)
pub const LONG_SYNC: [u8; 8] = [0x55, 0x00, 0x5E, 0x00, 0xAA, 0xBB, 0xCC, 0xDD];

/// Sync sequence used for 90-byte records (bytes 4..8, primary marker last)
pub const SHORT_SYNC: [u8; 4] = [0xAA, 0xBB, 0xCC, 0x55];

/// Field values of one primary record as stored on disk
#[derive(Debug, Clone)]
pub struct RawPrimary {
    pub index: u32,
    /// Stored 0-based
    pub cycle: u32,
    pub step: u8,
    pub status: u8,
    pub elapsed_ms: u64,
    pub voltage: i32,
    pub current: i32,
    pub charge_capacity: i64,
    pub discharge_capacity: i64,
    pub charge_energy: i64,
    pub discharge_energy: i64,
    pub date: (u16, u8, u8, u8, u8, u8),
    pub range: i32,
}

impl Default for RawPrimary {
    fn default() -> Self {
        Self {
            index: 1,
            cycle: 0,
            step: 1,
            status: 1,
            elapsed_ms: 0,
            voltage: 37_000,
            current: 1_000,
            charge_capacity: 0,
            discharge_capacity: 0,
            charge_energy: 0,
            discharge_energy: 0,
            date: (2024, 3, 1, 8, 0, 0),
            range: 100,
        }
    }
}

impl RawPrimary {
    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    pub fn with_step(mut self, step: u8) -> Self {
        self.step = step;
        self
    }
}

fn put(buf: &mut [u8], at: usize, bytes: &[u8]) {
    buf[at..at + bytes.len()].copy_from_slice(bytes);
}

/// Write the primary fields into a record buffer
pub fn write_primary(buf: &mut [u8], raw: &RawPrimary) {
    put(buf, ss::INDEX_AT, &raw.index.to_le_bytes());
    put(buf, ss::CYCLE_AT, &raw.cycle.to_le_bytes());
    buf[ss::STEP_AT] = raw.step;
    buf[ss::STATUS_AT] = raw.status;
    put(buf, ss::ELAPSED_MS_AT, &raw.elapsed_ms.to_le_bytes());
    put(buf, ss::VOLTAGE_AT, &raw.voltage.to_le_bytes());
    put(buf, ss::CURRENT_AT, &raw.current.to_le_bytes());
    put(buf, ss::CHARGE_CAPACITY_AT, &raw.charge_capacity.to_le_bytes());
    put(buf, ss::DISCHARGE_CAPACITY_AT, &raw.discharge_capacity.to_le_bytes());
    put(buf, ss::CHARGE_ENERGY_AT, &raw.charge_energy.to_le_bytes());
    put(buf, ss::DISCHARGE_ENERGY_AT, &raw.discharge_energy.to_le_bytes());
    let (year, month, day, hour, minute, second) = raw.date;
    put(buf, ss::DATE_AT, &year.to_le_bytes());
    put(buf, ss::DATE_AT + 2, &[month, day, hour, minute, second]);
    put(buf, ss::RANGE_AT, &raw.range.to_le_bytes());
}

/// One 94-byte primary record
pub fn long_record(raw: &RawPrimary) -> Vec<u8> {
    let mut record = vec![0u8; ss::LONG_RECORD_LEN];
    put(&mut record, 0, &LONG_SYNC);
    write_primary(&mut record, raw);
    record
}

/// A 94-byte-layout stream: the first record starts at the probe window
pub fn long_stream(records: &[Vec<u8>]) -> Vec<u8> {
    let mut stream = vec![0u8; ss::LAYOUT_PROBE.start];
    for record in records {
        stream.extend_from_slice(record);
    }
    stream
}

/// One 90-byte primary record
pub fn short_record(raw: &RawPrimary) -> Vec<u8> {
    let mut record = vec![0u8; ss::SHORT_RECORD_LEN];
    put(&mut record, ss::SHORT_SYNC_OFFSET, &SHORT_SYNC);
    write_primary(&mut record, raw);
    record
}

/// One 90-byte auxiliary record
pub fn short_aux_record(
    marker: u8,
    index: u32,
    temperature_raw: i16,
    second_temperature_raw: i16,
) -> Vec<u8> {
    let mut record = vec![0u8; ss::SHORT_RECORD_LEN];
    put(&mut record, ss::SHORT_SYNC_OFFSET, &SHORT_SYNC);
    record[ss::AUX_CHANNEL_AT] = marker;
    put(&mut record, ss::INDEX_AT, &index.to_le_bytes());
    put(&mut record, ss::VOLTAGE_AT, &3_000i32.to_le_bytes());
    put(&mut record, ss::AUX_TEMPERATURE_AT, &temperature_raw.to_le_bytes());
    put(
        &mut record,
        ss::AUX_SECOND_TEMPERATURE_AT,
        &second_temperature_raw.to_le_bytes(),
    );
    record
}

/// A 90-byte-layout stream: the first sync lands at the short sync window
pub fn short_stream(records: &[Vec<u8>]) -> Vec<u8> {
    let mut stream = vec![0u8; ss::SHORT_SYNC.start - ss::SHORT_SYNC_OFFSET];
    for record in records {
        stream.extend_from_slice(record);
    }
    stream
}

// =============================================================================
// Split-stream fixtures
// =============================================================================

/// Lay records out in 4096-byte blocks after a header carrying `version`
pub fn split_file(version: u8, records: &[Vec<u8>], record_len: usize, trailer: usize) -> Vec<u8> {
    let mut file = vec![0u8; sp::HEADER_LEN];
    file[sp::VERSION_AT] = version;

    let per_block = (sp::BLOCK_LEN - sp::PAYLOAD_START - trailer) / record_len;
    for chunk in records.chunks(per_block.max(1)) {
        let mut block = vec![0u8; sp::BLOCK_LEN];
        for (slot, record) in chunk.iter().enumerate() {
            let at = sp::PAYLOAD_START + slot * record_len;
            block[at..at + record.len()].copy_from_slice(record);
        }
        file.extend_from_slice(&block);
    }
    file
}

/// `data.ndc` with raw `(voltage, current)` float pairs
pub fn telemetry_file(samples: &[(f32, f32)]) -> Vec<u8> {
    let records: Vec<Vec<u8>> = samples
        .iter()
        .map(|(voltage, current)| {
            let mut pair = voltage.to_le_bytes().to_vec();
            pair.extend_from_slice(&current.to_le_bytes());
            pair
        })
        .collect();
    split_file(0, &records, 8, sp::DATA_TRAILER)
}

/// Field values of one run-info record
#[derive(Debug, Clone, Default)]
pub struct RawRunInfo {
    pub elapsed_ms: i32,
    pub charge_capacity: f32,
    pub discharge_capacity: f32,
    pub charge_energy: f32,
    pub discharge_energy: f32,
    pub timestamp: i32,
    pub step: i32,
    pub index: i32,
}

pub fn run_info_record(raw: &RawRunInfo, record_len: usize) -> Vec<u8> {
    let mut record = vec![0u8; record_len];
    put(&mut record, 0, &raw.elapsed_ms.to_le_bytes());
    put(&mut record, 5, &raw.charge_capacity.to_le_bytes());
    put(&mut record, 9, &raw.discharge_capacity.to_le_bytes());
    put(&mut record, 13, &raw.charge_energy.to_le_bytes());
    put(&mut record, 17, &raw.discharge_energy.to_le_bytes());
    put(&mut record, 33, &raw.timestamp.to_le_bytes());
    put(&mut record, 37, &raw.step.to_le_bytes());
    put(&mut record, 41, &raw.index.to_le_bytes());
    record
}

/// `data_runInfo.ndc` in the layout matching `version`
pub fn run_info_file(version: u8, rows: &[RawRunInfo]) -> Vec<u8> {
    let (record_len, trailer) = if version >= sp::RUN_INFO_LONG_FROM {
        (sp::RUN_INFO_LONG_RECORD, sp::RUN_INFO_LONG_TRAILER)
    } else {
        (sp::RUN_INFO_SHORT_RECORD, sp::RUN_INFO_SHORT_TRAILER)
    };
    let records: Vec<Vec<u8>> = rows
        .iter()
        .map(|row| run_info_record(row, record_len))
        .collect();
    split_file(version, &records, record_len, trailer)
}

/// `data_step.ndc` rows of `(0-based cycle, step id, status code)`
pub fn step_file(version: u8, rows: &[(i32, i32, i8)]) -> Vec<u8> {
    let records: Vec<Vec<u8>> = rows
        .iter()
        .map(|(cycle, step, status)| {
            let mut record = vec![0u8; sp::STEP_RECORD];
            put(&mut record, 0, &cycle.to_le_bytes());
            put(&mut record, 4, &step.to_le_bytes());
            record[24] = *status as u8;
            record
        })
        .collect();
    split_file(version, &records, sp::STEP_RECORD, sp::STEP_TRAILER)
}

/// 2024-03-01 08:00:00 UTC
pub const BASE_UNIX: i32 = 1_709_280_000;
