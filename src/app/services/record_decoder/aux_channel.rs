//! Auxiliary channel records (thermocouples and auxiliary voltage)
//!
//! Two sub-layouts share the primary record geometry: `0x65` carries one
//! temperature, `0x74` carries two. Aux rows are joined onto primary records
//! by index.

use super::layout::{read_i16, read_i32, read_u8, read_u32};
use crate::app::models::{AuxRecord, Record};
use crate::constants::single_stream as ss;
use crate::constants::{TEMPERATURE_DIVISOR, VOLTAGE_DIVISOR};
use std::collections::HashMap;
use tracing::debug;

/// Decode an auxiliary record; `None` for markers outside the two aux layouts
pub fn decode_aux(record: &[u8], marker: u8) -> Option<AuxRecord> {
    let second_temperature_c = match marker {
        ss::AUX_MARKER_VT => None,
        ss::AUX_MARKER_VTT => Some(
            f64::from(read_i16(record, ss::AUX_SECOND_TEMPERATURE_AT)) / TEMPERATURE_DIVISOR,
        ),
        _ => return None,
    };

    Some(AuxRecord {
        index: read_u32(record, ss::INDEX_AT),
        channel: read_u8(record, ss::AUX_CHANNEL_AT),
        voltage_v: f64::from(read_i32(record, ss::VOLTAGE_AT)) / VOLTAGE_DIVISOR,
        temperature_c: f64::from(read_i16(record, ss::AUX_TEMPERATURE_AT)) / TEMPERATURE_DIVISOR,
        second_temperature_c,
    })
}

/// Left-join the first aux temperature per index onto the records
///
/// Records without a matching aux row keep `aux_temperature_c = None`.
pub fn join_aux(mut records: Vec<Record>, aux: &[AuxRecord]) -> Vec<Record> {
    let mut by_index: HashMap<u32, f64> = HashMap::with_capacity(aux.len());
    for row in aux {
        by_index.entry(row.index).or_insert(row.temperature_c);
    }

    let mut matched = 0;
    for record in &mut records {
        if let Some(temperature) = by_index.get(&record.index) {
            record.aux_temperature_c = Some(*temperature);
            matched += 1;
        }
    }
    debug!(
        "Joined {} aux rows onto {} of {} records",
        by_index.len(),
        matched,
        records.len()
    );
    records
}
