//! Tests for recipe classification


pub use crate::app::services::aggregator::tests::{SeriesBuilder, standard_cycle};
use crate::app::models::{Record, StepState};

/// Standard protocol with a chosen charge current
pub fn cycle_with_charge(builder: SeriesBuilder, cycle: u32, charge_a: f64) -> SeriesBuilder {
    builder
        .cycle(cycle)
        .step(StepState::Rest, 3, 0.0, 3.5, 3.5)
        .step(StepState::CcChg, 5, charge_a, 3.6, 4.2)
        .step(StepState::Rest, 3, 0.0, 4.1, 4.1)
        .step(StepState::CcDchg, 4, -2.0, 4.0, 3.0)
}

/// Cycles numbered from 1 at 2 A, one per charge end voltage
pub fn series_with_charge_voltage(end_voltages: &[f64]) -> Vec<Record> {
    let mut builder = SeriesBuilder::new(60.0);
    for (i, end_v) in end_voltages.iter().enumerate() {
        builder = builder
            .cycle(i as u32 + 1)
            .step(StepState::Rest, 3, 0.0, 3.5, 3.5)
            .step(StepState::CcChg, 5, 2.0, 3.6, *end_v)
            .step(StepState::Rest, 3, 0.0, 4.1, 4.1)
            .step(StepState::CcDchg, 4, -2.0, 4.0, 3.0);
    }
    builder.build()
}

/// Cycles numbered from 1, one per charge current
pub fn series(charge_currents: &[f64]) -> Vec<Record> {
    let mut builder = SeriesBuilder::new(60.0);
    for (i, current) in charge_currents.iter().enumerate() {
        builder = cycle_with_charge(builder, i as u32 + 1, *current);
    }
    builder.build()
}
