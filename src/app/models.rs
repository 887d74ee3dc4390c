//! Data models for NDAX decoding
//!
//! This module contains the core data structures produced by the decoding
//! pipeline: the per-sample [`Record`], its partially-known split-stream
//! precursor [`PartialRecord`], the step and cycle summaries, recipe
//! signatures and the archive metadata.

use crate::{Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// =============================================================================
// Step State
// =============================================================================

/// Operating mode of the instrument channel during a step
///
/// The discriminants are the instrument's own status codes. Codes outside
/// this table are rejected rather than guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StepState {
    CcChg = 1,
    CcDchg = 2,
    CvChg = 3,
    Rest = 4,
    Cycle = 5,
    CccvChg = 7,
    CpDchg = 8,
    CpChg = 9,
    CrDchg = 10,
    Pause = 13,
    Pulse = 16,
    Sim = 17,
    CvDchg = 19,
    CccvDchg = 20,
    Control = 21,
    CpcvDchg = 26,
    CpcvChg = 27,
}

impl StepState {
    /// Look up a status code
    pub fn from_code(code: i32) -> Result<Self> {
        let state = match code {
            1 => Self::CcChg,
            2 => Self::CcDchg,
            3 => Self::CvChg,
            4 => Self::Rest,
            5 => Self::Cycle,
            7 => Self::CccvChg,
            8 => Self::CpDchg,
            9 => Self::CpChg,
            10 => Self::CrDchg,
            13 => Self::Pause,
            16 => Self::Pulse,
            17 => Self::Sim,
            19 => Self::CvDchg,
            20 => Self::CccvDchg,
            21 => Self::Control,
            26 => Self::CpcvDchg,
            27 => Self::CpcvChg,
            other => return Err(Error::unknown_status_code(other)),
        };
        Ok(state)
    }

    /// Instrument status code
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Label used in step tables and column values
    pub fn name(self) -> &'static str {
        match self {
            Self::CcChg => "CC_Chg",
            Self::CcDchg => "CC_Dchg",
            Self::CvChg => "CV_Chg",
            Self::Rest => "Rest",
            Self::Cycle => "Cycle",
            Self::CccvChg => "CCCV_Chg",
            Self::CpDchg => "CP_Dchg",
            Self::CpChg => "CP_Chg",
            Self::CrDchg => "CR_Dchg",
            Self::Pause => "Pause",
            Self::Pulse => "Pulse",
            Self::Sim => "SIM",
            Self::CvDchg => "CV_Dchg",
            Self::CccvDchg => "CCCV_Dchg",
            Self::Control => "Control",
            Self::CpcvDchg => "CPCV_Dchg",
            Self::CpcvChg => "CPCV_Chg",
        }
    }

    pub fn all() -> [StepState; 17] {
        [
            Self::CcChg,
            Self::CcDchg,
            Self::CvChg,
            Self::Rest,
            Self::Cycle,
            Self::CccvChg,
            Self::CpDchg,
            Self::CpChg,
            Self::CrDchg,
            Self::Pause,
            Self::Pulse,
            Self::Sim,
            Self::CvDchg,
            Self::CccvDchg,
            Self::Control,
            Self::CpcvDchg,
            Self::CpcvChg,
        ]
    }

    pub fn is_rest(self) -> bool {
        self == Self::Rest
    }

    /// Simulation steps replay arbitrary profiles and are exempt from plausibility checks
    pub fn is_simulation(self) -> bool {
        self == Self::Sim
    }
}

impl FromStr for StepState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|state| state.name() == s)
            .ok_or_else(|| Error::configuration(format!("unknown step type label '{}'", s)))
    }
}

impl TryFrom<i32> for StepState {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self> {
        Self::from_code(code)
    }
}

impl std::fmt::Display for StepState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Records
// =============================================================================

/// One sampled instant of a test channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Strictly increasing sample index; ordering and join key
    pub index: u32,

    /// 1-based cycle number
    pub cycle: u32,

    /// 1-based monotonic step number across the whole file
    pub step: u32,

    pub status: StepState,

    /// Seconds since the start of the current step
    pub elapsed_time_s: f64,

    pub voltage_v: f64,

    /// Signed current; the sign encodes charge or discharge
    pub current_a: f64,

    /// Unsigned capacity, reset at step boundaries
    pub capacity_ah: f64,

    pub energy_wh: f64,

    /// Wall-clock time of the sample
    pub timestamp: NaiveDateTime,

    /// Cleared by the validator for rows that fail a per-row check
    pub validated: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dcir_mohm: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aux_temperature_c: Option<f64>,

    /// Per-cycle step id as written by the instrument (kept on request)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_number: Option<u32>,
}

/// A split-stream row before reconstruction
///
/// Voltage and current always come from the telemetry stream. Everything
/// else is joined from the run-info and step-identity streams and may be
/// missing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartialRecord {
    pub index: u32,
    pub voltage_v: f64,
    pub current_a: f64,
    pub cycle: Option<u32>,
    pub step: Option<u32>,
    pub status: Option<StepState>,
    pub elapsed_time_s: Option<f64>,
    pub capacity_ah: Option<f64>,
    pub energy_wh: Option<f64>,
    pub timestamp: Option<NaiveDateTime>,
    pub step_number: Option<u32>,
}

impl PartialRecord {
    /// True when every joined field is present
    pub fn is_complete(&self) -> bool {
        self.cycle.is_some()
            && self.step.is_some()
            && self.status.is_some()
            && self.elapsed_time_s.is_some()
            && self.capacity_ah.is_some()
            && self.energy_wh.is_some()
            && self.timestamp.is_some()
    }

    /// Convert into a [`Record`] when every field is known
    pub fn into_record(self) -> Option<Record> {
        Some(Record {
            index: self.index,
            cycle: self.cycle?,
            step: self.step?,
            status: self.status?,
            elapsed_time_s: self.elapsed_time_s?,
            voltage_v: self.voltage_v,
            current_a: self.current_a,
            capacity_ah: self.capacity_ah?,
            energy_wh: self.energy_wh?,
            timestamp: self.timestamp?,
            validated: true,
            dcir_mohm: None,
            aux_temperature_c: None,
            step_number: self.step_number,
        })
    }
}

impl From<Record> for PartialRecord {
    fn from(record: Record) -> Self {
        Self {
            index: record.index,
            voltage_v: record.voltage_v,
            current_a: record.current_a,
            cycle: Some(record.cycle),
            step: Some(record.step),
            status: Some(record.status),
            elapsed_time_s: Some(record.elapsed_time_s),
            capacity_ah: Some(record.capacity_ah),
            energy_wh: Some(record.energy_wh),
            timestamp: Some(record.timestamp),
            step_number: record.step_number,
        }
    }
}

/// Auxiliary channel sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxRecord {
    pub index: u32,
    pub channel: u8,
    pub voltage_v: f64,
    pub temperature_c: f64,
    /// Present only on dual-thermocouple records
    pub second_temperature_c: Option<f64>,
}

// =============================================================================
// Summaries
// =============================================================================

/// One contiguous run of a constant step number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    pub cycle: u32,
    pub step: u32,
    pub step_type: StepState,
    pub duration_s: f64,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub start_voltage_v: f64,
    pub end_voltage_v: f64,
    pub start_current_a: f64,
    pub end_current_a: f64,
    pub capacity_ah: f64,
    pub energy_wh: f64,
    pub min_voltage_v: f64,
    pub max_voltage_v: f64,
    pub dcir_mohm: Option<f64>,
}

/// Charge or discharge figures of one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolaritySummary {
    pub capacity_ah: f64,
    pub energy_wh: f64,
    pub duration_s: f64,
    pub onset_voltage_v: f64,
    pub terminal_voltage_v: f64,
    pub onset_current_a: f64,
    pub terminal_current_a: f64,
}

/// One row per cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle: u32,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub charge: Option<PolaritySummary>,
    pub discharge: Option<PolaritySummary>,
    pub average_dcir_mohm: Option<f64>,
}

impl CycleSummary {
    /// Discharge over charge capacity, when both polarities are present
    pub fn coulombic_efficiency(&self) -> Option<f64> {
        match (&self.charge, &self.discharge) {
            (Some(charge), Some(discharge)) if charge.capacity_ah > 0.0 => {
                Some(discharge.capacity_ah / charge.capacity_ah)
            }
            _ => None,
        }
    }
}

/// Control signature of one step, used to compare cycles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStep {
    pub status: StepState,
    /// Target voltage: max for the charge step, min for the discharge step
    pub voltage_v: f64,
    /// Set-point current: first sample of a charge or discharge step
    pub current_a: f64,
    /// Duration of a rest step
    pub rest_time_s: f64,
    pub cutoff_current_a: f64,
    pub cutoff_voltage_v: f64,
}

// =============================================================================
// Metadata
// =============================================================================

/// Test metadata read from the archive's XML members
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TestMetadata {
    pub barcode: Option<String>,
    pub process_name: Option<String>,
    pub remark: Option<String>,
    pub start_time: Option<String>,
}

impl TestMetadata {
    /// True when the fields the full validation profile inspects were all found
    pub fn is_checkable(&self) -> bool {
        self.barcode.is_some() && self.process_name.is_some() && self.start_time.is_some()
    }
}
