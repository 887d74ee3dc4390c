//! Tests for step and cycle aggregation


use crate::app::models::{Record, StepState};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

pub fn at(seconds: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
        + TimeDelta::seconds(seconds)
}

/// Builds a series step by step with a fixed sampling interval
pub struct SeriesBuilder {
    records: Vec<Record>,
    cycle: u32,
    step: u32,
    interval_s: f64,
}

impl SeriesBuilder {
    pub fn new(interval_s: f64) -> Self {
        Self {
            records: Vec::new(),
            cycle: 1,
            step: 0,
            interval_s,
        }
    }

    pub fn cycle(mut self, cycle: u32) -> Self {
        self.cycle = cycle;
        self
    }

    /// Append `rows` samples of one step, voltage ramping linearly
    pub fn step(
        mut self,
        status: StepState,
        rows: usize,
        current_a: f64,
        voltage_from: f64,
        voltage_to: f64,
    ) -> Self {
        self.step += 1;
        for i in 0..rows {
            let elapsed = i as f64 * self.interval_s;
            let index = self.records.len() as u32 + 1;
            let fraction = if rows > 1 {
                i as f64 / (rows - 1) as f64
            } else {
                0.0
            };
            let voltage = voltage_from + (voltage_to - voltage_from) * fraction;
            let capacity = current_a.abs() * elapsed / 3600.0;
            self.records.push(Record {
                index,
                cycle: self.cycle,
                step: self.step,
                status,
                elapsed_time_s: elapsed,
                voltage_v: voltage,
                current_a,
                capacity_ah: capacity,
                energy_wh: capacity * voltage,
                timestamp: at((index as f64 * self.interval_s) as i64),
                validated: true,
                dcir_mohm: None,
                aux_temperature_c: None,
                step_number: None,
            });
        }
        self
    }

    pub fn build(self) -> Vec<Record> {
        self.records
    }
}

/// Rest, CC charge, rest, CC discharge
pub fn standard_cycle(builder: SeriesBuilder, cycle: u32) -> SeriesBuilder {
    builder
        .cycle(cycle)
        .step(StepState::Rest, 3, 0.0, 3.5, 3.5)
        .step(StepState::CcChg, 5, 2.0, 3.6, 4.2)
        .step(StepState::Rest, 3, 0.0, 4.1, 4.1)
        .step(StepState::CcDchg, 4, -2.0, 4.0, 3.0)
}
