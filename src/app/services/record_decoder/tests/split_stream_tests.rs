//! Tests for the three-file split-stream decoder

use super::*;
use crate::Error;
use crate::app::models::StepState;
use crate::app::services::record_decoder::SplitStreamDecoder;
use crate::app::services::record_decoder::split_stream::{
    decode_run_info, decode_steps, decode_telemetry, join_streams,
};
use crate::config::TimezoneConfig;
use chrono::NaiveDate;

fn run_info_row(index: i32, step: i32, elapsed_ms: i32, seconds_after_base: i32) -> RawRunInfo {
    RawRunInfo {
        elapsed_ms,
        charge_capacity: 3_600_000.0,
        discharge_capacity: 0.0,
        charge_energy: 7_200_000.0,
        discharge_energy: 3_600_000.0,
        timestamp: BASE_UNIX + seconds_after_base,
        step,
        index,
    }
}

#[test]
fn test_telemetry_skips_padding_and_numbers_rows() {
    let file = telemetry_file(&[(37_000.0, 1_500.0), (0.0, 99.0), (37_100.0, -2_000.0)]);
    let rows = decode_telemetry(&file);

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].index, 1);
    assert_eq!(rows[1].index, 2);
    assert!((rows[0].voltage_v - 3.7).abs() < 1e-6);
    assert!((rows[0].current_a - 1.5).abs() < 1e-6);
    assert!((rows[1].current_a + 2.0).abs() < 1e-6);
}

#[test]
fn test_telemetry_spans_blocks() {
    // 495 pairs fit one block
    let samples: Vec<(f32, f32)> = (0..600).map(|i| (30_000.0 + i as f32, 0.0)).collect();
    let rows = decode_telemetry(&telemetry_file(&samples));
    assert_eq!(rows.len(), 600);
    assert_eq!(rows[599].index, 600);
}

#[test]
fn test_run_info_long_layout() {
    let file = run_info_file(
        14,
        &[
            run_info_row(1, 1, 0, 0),
            RawRunInfo::default(), // padding: index 0
            run_info_row(2, 1, 1_000, 1),
            run_info_row(3, 2, 0, 2),
        ],
    );
    let rows = decode_run_info(&file, &TimezoneConfig::default()).unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1].elapsed_time_s, 1.0);
    assert!((rows[0].capacity_ah - 1.0).abs() < 1e-9);
    assert!((rows[0].energy_wh - 1.0).abs() < 1e-9);
    assert_eq!(
        rows.iter().map(|r| r.step).collect::<Vec<_>>(),
        vec![1, 1, 2]
    );
    // 08:00:00 UTC read at +06:00 and shown at +05:30
    assert_eq!(
        rows[0].timestamp,
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(7, 30, 0)
            .unwrap()
    );
}

#[test]
fn test_run_info_short_layout() {
    let file = run_info_file(11, &[run_info_row(1, 5, 250, 0), run_info_row(2, 5, 500, 0)]);
    let rows = decode_run_info(&file, &TimezoneConfig::default()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].elapsed_time_s, 0.5);
    assert_eq!(rows[1].step, 1);
}

#[test]
fn test_old_versions_are_rejected() {
    let run_info = run_info_file(10, &[run_info_row(1, 1, 0, 0)]);
    assert!(matches!(
        decode_run_info(&run_info, &TimezoneConfig::default()),
        Err(Error::UnsupportedVersion { version: 10, .. })
    ));

    let steps = step_file(9, &[(0, 1, 1)]);
    assert!(matches!(
        decode_steps(&steps),
        Err(Error::UnsupportedVersion { version: 9, .. })
    ));
}

#[test]
fn test_step_rows_numbered_by_position() {
    let file = step_file(14, &[(0, 1, 4), (0, 2, 1), (0, 0, 0), (1, 1, 4)]);
    let rows = decode_steps(&file).unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].step, 3);
    assert_eq!(rows[2].cycle, 2);
    assert_eq!(rows[1].status, StepState::CcChg);
}

#[test]
fn test_step_unknown_status_is_fatal() {
    let file = step_file(14, &[(0, 1, 6)]);
    assert!(matches!(
        decode_steps(&file),
        Err(Error::UnknownStatusCode { code: 6 })
    ));
}

#[test]
fn test_join_forward_fills_step_and_leaves_gaps() {
    let telemetry = decode_telemetry(&telemetry_file(&[
        (37_000.0, 0.0),
        (37_000.0, 0.0),
        (37_000.0, 1_000.0),
        (37_100.0, 1_000.0),
    ]));
    let run_info = decode_run_info(
        &run_info_file(14, &[run_info_row(1, 1, 0, 0), run_info_row(4, 2, 2_000, 3)]),
        &TimezoneConfig::default(),
    )
    .unwrap();
    let steps = decode_steps(&step_file(14, &[(0, 1, 4), (0, 2, 1)])).unwrap();

    let rows = join_streams(telemetry, &run_info, &steps, true);
    assert_eq!(rows.len(), 4);

    assert!(rows[0].is_complete());
    assert_eq!(rows[1].step, Some(1));
    assert_eq!(rows[1].status, Some(StepState::Rest));
    assert_eq!(rows[1].elapsed_time_s, None);
    assert_eq!(rows[2].step, Some(1));
    assert_eq!(rows[3].step, Some(2));
    assert_eq!(rows[3].status, Some(StepState::CcChg));
    assert_eq!(rows[3].step_number, Some(2));
}

#[test]
fn test_decoder_end_to_end_bytes() {
    let decoder = SplitStreamDecoder::new(TimezoneConfig::default(), false);
    let output = decoder
        .decode_bytes(
            &telemetry_file(&[(37_000.0, 0.0), (37_000.0, 0.0)]),
            &run_info_file(14, &[run_info_row(1, 1, 0, 0), run_info_row(2, 1, 1_000, 1)]),
            &step_file(14, &[(0, 1, 4)]),
        )
        .unwrap();

    assert_eq!(output.rows.len(), 2);
    assert!(output.rows.iter().all(|row| row.is_complete()));
    assert_eq!(output.rows[0].step_number, None);
    assert_eq!(output.stats.records_scanned, 2);
}
