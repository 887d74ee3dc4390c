//! DC internal resistance at current onsets

use crate::app::models::Record;
use crate::constants::DCIR_SCALE;
use tracing::debug;

/// Derive DCIR where current switches on
///
/// Runs only when no row already carries a DCIR. A row whose predecessor sits
/// at zero current while it does not gets `|ΔV/ΔI| × 1e6`; every other row
/// stays `None`.
///
/// # Returns
///
/// The series with DCIR filled, and how many onsets were found
pub fn derive_dcir(mut records: Vec<Record>) -> (Vec<Record>, usize) {
    if records.iter().any(|r| r.dcir_mohm.is_some()) {
        debug!("Series already carries DCIR, leaving it untouched");
        return (records, 0);
    }

    let mut onsets = 0;
    for i in 1..records.len() {
        let (previous_voltage, previous_current) =
            (records[i - 1].voltage_v, records[i - 1].current_a);
        let record = &mut records[i];
        if previous_current == 0.0 && record.current_a != 0.0 {
            let resistance = ((record.voltage_v - previous_voltage)
                / (record.current_a - previous_current))
                .abs();
            record.dcir_mohm = Some(resistance * DCIR_SCALE);
            onsets += 1;
        }
    }

    debug!("Derived DCIR at {} current onsets", onsets);
    (records, onsets)
}
