//! Tests for series validation


use crate::app::models::{Record, StepState, TestMetadata};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

pub fn at(seconds: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
        + TimeDelta::seconds(seconds)
}

/// A plausible charge row sampled once per second
pub fn record(index: u32, step: u32, elapsed_s: f64) -> Record {
    Record {
        index,
        cycle: 1,
        step,
        status: StepState::CcChg,
        elapsed_time_s: elapsed_s,
        voltage_v: 3.7,
        current_a: 1.0,
        capacity_ah: elapsed_s / 3600.0,
        energy_wh: 3.7 * elapsed_s / 3600.0,
        timestamp: at(index as i64),
        validated: true,
        dcir_mohm: None,
        aux_temperature_c: None,
        step_number: None,
    }
}

/// Ten one-second rows in a single step
pub fn clean_series() -> Vec<Record> {
    (1..=10).map(|i| record(i, 1, (i - 1) as f64)).collect()
}

pub fn metadata(barcode: &str) -> TestMetadata {
    TestMetadata {
        barcode: Some(barcode.to_string()),
        process_name: Some("Formation_0.5C".to_string()),
        remark: None,
        start_time: Some("2024-03-01 08:00:00".to_string()),
    }
}
