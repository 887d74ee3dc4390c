//! Synthetic NDAX archives for integration tests
//!
//! Streams are built byte-for-byte and zipped into temporary `.ndax` files,
//! so the whole pipeline runs without instrument data.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Timelike, Datelike};
use ndax_decoder::constants::{members, single_stream as ss, split_stream as sp};
use std::io::Write;
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;

pub const CHARGE_A: f64 = 1.0;
pub const INTERVAL_S: u64 = 10;

/// Status codes as the instrument stores them
pub const CC_CHG: u8 = 1;
pub const CC_DCHG: u8 = 2;
pub const REST: u8 = 4;

/// 2024-03-01 08:00:00 UTC
pub const BASE_UNIX: i32 = 1_709_280_000;

pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

/// One sample of the synthetic protocol
#[derive(Debug, Clone)]
pub struct Sample {
    pub index: u32,
    /// 1-based
    pub cycle: u32,
    /// Per-cycle step id
    pub step_id: u32,
    pub status: u8,
    pub elapsed_s: u64,
    pub voltage_v: f64,
    pub current_a: f64,
    /// Seconds since `base_time`
    pub clock_s: u64,
}

impl Sample {
    /// Accumulated capacity within the step
    pub fn capacity_ah(&self) -> f64 {
        self.elapsed_s as f64 * self.current_a.abs() / 3600.0
    }
}

/// Rest, charge and discharge per cycle; elapsed time restarts every step
pub fn protocol(cycles: u32) -> Vec<Sample> {
    let steps: [(u8, usize, f64, [f64; 4]); 3] = [
        (REST, 3, 0.0, [3.6, 3.6, 3.6, 3.6]),
        (CC_CHG, 4, CHARGE_A, [3.7, 3.8, 3.9, 4.0]),
        (CC_DCHG, 4, -CHARGE_A, [3.9, 3.8, 3.7, 3.6]),
    ];

    let mut samples = Vec::new();
    let mut clock_s = 0;
    for cycle in 1..=cycles {
        for (step_id, (status, rows, current_a, voltages)) in steps.iter().enumerate() {
            for row in 0..*rows {
                samples.push(Sample {
                    index: samples.len() as u32 + 1,
                    cycle,
                    step_id: step_id as u32 + 1,
                    status: *status,
                    elapsed_s: row as u64 * INTERVAL_S,
                    voltage_v: voltages[row],
                    current_a: *current_a,
                    clock_s,
                });
                clock_s += INTERVAL_S;
            }
        }
    }
    samples
}

/// One step of a longer protocol, sampled every `interval_s`
#[derive(Debug, Clone, Copy)]
pub struct Phase {
    pub status: u8,
    pub duration_s: u64,
    pub interval_s: u64,
    pub current_a: f64,
    pub voltage_from: f64,
    pub voltage_to: f64,
}

/// Repeat `phases` for each cycle, sampling both ends of every step
pub fn phased_protocol(phases: &[Phase], cycles: u32) -> Vec<Sample> {
    let mut samples = Vec::new();
    let mut clock_s = 0;
    for cycle in 1..=cycles {
        for (step_id, phase) in phases.iter().enumerate() {
            let rows = phase.duration_s / phase.interval_s + 1;
            for row in 0..rows {
                let elapsed_s = row * phase.interval_s;
                let fraction = elapsed_s as f64 / phase.duration_s as f64;
                samples.push(Sample {
                    index: samples.len() as u32 + 1,
                    cycle,
                    step_id: step_id as u32 + 1,
                    status: phase.status,
                    elapsed_s,
                    voltage_v: phase.voltage_from + (phase.voltage_to - phase.voltage_from) * fraction,
                    current_a: phase.current_a,
                    clock_s,
                });
                clock_s += phase.interval_s;
            }
        }
    }
    samples
}

fn put(buf: &mut [u8], at: usize, bytes: &[u8]) {
    buf[at..at + bytes.len()].copy_from_slice(bytes);
}

// =============================================================================
// Single-stream
// =============================================================================

const LONG_SYNC: [u8; 8] = [0x55, 0x00, 0x5E, 0x00, 0xAA, 0xBB, 0xCC, 0xDD];

/// Range code 100 scales current, capacity and energy by 0.01
const RANGE: i32 = 100;

fn single_record(sample: &Sample) -> Vec<u8> {
    let mut record = vec![0u8; ss::LONG_RECORD_LEN];
    put(&mut record, 0, &LONG_SYNC);
    put(&mut record, ss::INDEX_AT, &sample.index.to_le_bytes());
    put(&mut record, ss::CYCLE_AT, &(sample.cycle - 1).to_le_bytes());
    record[ss::STEP_AT] = sample.step_id as u8;
    record[ss::STATUS_AT] = sample.status;
    put(&mut record, ss::ELAPSED_MS_AT, &(sample.elapsed_s * 1000).to_le_bytes());

    let voltage = (sample.voltage_v * 10_000.0).round() as i32;
    let current = (sample.current_a * 100.0).round() as i32;
    put(&mut record, ss::VOLTAGE_AT, &voltage.to_le_bytes());
    put(&mut record, ss::CURRENT_AT, &current.to_le_bytes());

    // Ah = raw * 0.01 / 3600
    let capacity = (sample.capacity_ah() * 360_000.0).round() as i64;
    let energy = (sample.capacity_ah() * sample.voltage_v * 360_000.0).round() as i64;
    let (capacity_at, energy_at) = if sample.current_a < 0.0 {
        (ss::DISCHARGE_CAPACITY_AT, ss::DISCHARGE_ENERGY_AT)
    } else {
        (ss::CHARGE_CAPACITY_AT, ss::CHARGE_ENERGY_AT)
    };
    put(&mut record, capacity_at, &capacity.to_le_bytes());
    put(&mut record, energy_at, &energy.to_le_bytes());

    let time = base_time() + TimeDelta::seconds(sample.clock_s as i64);
    put(&mut record, ss::DATE_AT, &(time.year() as u16).to_le_bytes());
    put(
        &mut record,
        ss::DATE_AT + 2,
        &[
            time.month() as u8,
            time.day() as u8,
            time.hour() as u8,
            time.minute() as u8,
            time.second() as u8,
        ],
    );
    put(&mut record, ss::RANGE_AT, &RANGE.to_le_bytes());
    record
}

/// Consolidated `data.ndc` in the 94-byte layout
pub fn single_stream(samples: &[Sample]) -> Vec<u8> {
    let mut stream = vec![0u8; ss::LAYOUT_PROBE.start];
    for sample in samples {
        stream.extend_from_slice(&single_record(sample));
    }
    stream
}

// =============================================================================
// Split-stream
// =============================================================================

pub const SPLIT_VERSION: u8 = 14;

fn split_file(version: u8, records: &[Vec<u8>], record_len: usize, trailer: usize) -> Vec<u8> {
    let mut file = vec![0u8; sp::HEADER_LEN];
    file[sp::VERSION_AT] = version;

    let per_block = (sp::BLOCK_LEN - sp::PAYLOAD_START - trailer) / record_len;
    for chunk in records.chunks(per_block) {
        let mut block = vec![0u8; sp::BLOCK_LEN];
        for (slot, record) in chunk.iter().enumerate() {
            let at = sp::PAYLOAD_START + slot * record_len;
            block[at..at + record.len()].copy_from_slice(record);
        }
        file.extend_from_slice(&block);
    }
    file
}

/// `data.ndc`: voltage in 1e-4 V and current in mA, as floats
pub fn telemetry(samples: &[Sample]) -> Vec<u8> {
    let records: Vec<Vec<u8>> = samples
        .iter()
        .map(|s| {
            let mut pair = ((s.voltage_v * 10_000.0) as f32).to_le_bytes().to_vec();
            pair.extend_from_slice(&((s.current_a * 1_000.0) as f32).to_le_bytes());
            pair
        })
        .collect();
    split_file(0, &records, 8, sp::DATA_TRAILER)
}

/// `data_runInfo.ndc` for every sample whose index is not in `missing`
pub fn run_info(samples: &[Sample], missing: &[u32]) -> Vec<u8> {
    let records: Vec<Vec<u8>> = samples
        .iter()
        .filter(|s| !missing.contains(&s.index))
        .map(|s| {
            let mut record = vec![0u8; sp::RUN_INFO_LONG_RECORD];
            put(&mut record, 0, &((s.elapsed_s * 1000) as i32).to_le_bytes());
            // Counters are stored in unit-milliseconds
            let capacity = (s.capacity_ah() * sp::COUNTER_DIVISOR) as f32;
            let energy = (s.capacity_ah() * s.voltage_v * sp::COUNTER_DIVISOR) as f32;
            let (capacity_at, energy_at) = if s.current_a < 0.0 { (9, 17) } else { (5, 13) };
            put(&mut record, capacity_at, &capacity.to_le_bytes());
            put(&mut record, energy_at, &energy.to_le_bytes());
            put(&mut record, 33, &(BASE_UNIX + s.clock_s as i32).to_le_bytes());
            // Step ids are unique across the test
            let raw_step = ((s.cycle - 1) * 3 + s.step_id) as i32;
            put(&mut record, 37, &raw_step.to_le_bytes());
            put(&mut record, 41, &(s.index as i32).to_le_bytes());
            record
        })
        .collect();
    split_file(
        SPLIT_VERSION,
        &records,
        sp::RUN_INFO_LONG_RECORD,
        sp::RUN_INFO_LONG_TRAILER,
    )
}

/// `data_step.ndc`: one row per step of the protocol
pub fn step_stream(samples: &[Sample], version: u8) -> Vec<u8> {
    let mut records: Vec<Vec<u8>> = Vec::new();
    let mut last: Option<(u32, u32)> = None;
    for s in samples {
        if last == Some((s.cycle, s.step_id)) {
            continue;
        }
        last = Some((s.cycle, s.step_id));
        let mut record = vec![0u8; sp::STEP_RECORD];
        put(&mut record, 0, &((s.cycle - 1) as i32).to_le_bytes());
        put(&mut record, 4, &(s.step_id as i32).to_le_bytes());
        record[24] = s.status;
        records.push(record);
    }
    split_file(version, &records, sp::STEP_RECORD, sp::STEP_TRAILER)
}

// =============================================================================
// Archives
// =============================================================================

fn gbk(text: &str) -> Vec<u8> {
    let (bytes, _, _) = encoding_rs::GBK.encode(text);
    bytes.into_owned()
}

pub fn test_info_xml(barcode: &str, step_name: &str, start_time: &str) -> Vec<u8> {
    gbk(&format!(
        "<?xml version=\"1.0\" encoding=\"GB2312\"?>\n\
         <root><config><TestInfo Barcode=\"{}\" StepName=\"{}\" StartTime=\"{}\"/></config></root>",
        barcode, step_name, start_time
    ))
}

pub fn step_xml(remark: &str) -> Vec<u8> {
    gbk(&format!(
        "<?xml version=\"1.0\" encoding=\"GB2312\"?>\n\
         <root><config><Head_Info><Remark Value=\"{}\"/></Head_Info></config></root>",
        remark
    ))
}

/// Zip members into a temporary `.ndax` file
pub fn archive(entries: &[(&str, Vec<u8>)]) -> NamedTempFile {
    let file = tempfile::Builder::new().suffix(".ndax").tempfile().unwrap();
    let mut writer = zip::ZipWriter::new(file.reopen().unwrap());
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, bytes) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap();
    file
}

pub const BARCODE: &str = "CELL00000042";

/// Single-stream archive with metadata
pub fn single_stream_archive(samples: &[Sample]) -> NamedTempFile {
    archive(&[
        (members::DATA, single_stream(samples)),
        (
            members::TEST_INFO,
            test_info_xml(BARCODE, "formation.xml", "2024-03-01 08:00:00"),
        ),
        (members::STEP_XML, step_xml("化成 batch 7")),
    ])
}

/// Split-stream archive, with run-info rows for `missing` indices left out
pub fn split_stream_archive(samples: &[Sample], missing: &[u32]) -> NamedTempFile {
    archive(&[
        (members::DATA, telemetry(samples)),
        (members::RUN_INFO, run_info(samples, missing)),
        (members::STEP, step_stream(samples, SPLIT_VERSION)),
        (
            members::TEST_INFO,
            test_info_xml(BARCODE, "cycling", "2024-03-01 08:00:00"),
        ),
    ])
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {}, got {}",
        expected,
        actual
    );
}
