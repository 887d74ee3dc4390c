//! Validation verdicts

use crate::app::models::Record;
use std::fmt;

/// The first check a series failed
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    Empty,
    IndexStart { first: u32 },
    IndexNotIncreasing { previous: u32, index: u32 },
    CycleStart { minimum: u32 },
    StepStart { minimum: u32 },
    StepDecreasing { index: u32, previous: u32, step: u32 },
    VoltageTooLow { index: u32, voltage_v: f64, limit_v: f64 },
    NegativeCapacity { index: u32 },
    NegativeEnergy { index: u32 },
    CapacityCeiling { maximum_ah: f64, ceiling_ah: f64 },
    CurrentCeiling { maximum_a: f64, ceiling_a: f64 },
    ControlCharacters { field: &'static str },
    BarcodeLength { actual: usize, expected: usize },
    /// Rows cleared by the continuity pre-pass while that is configured as failing
    FlaggedRows { count: usize },
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "series is empty"),
            Self::IndexStart { first } => write!(f, "index starts at {} instead of 1", first),
            Self::IndexNotIncreasing { previous, index } => {
                write!(f, "index {} follows {} (not strictly increasing)", index, previous)
            }
            Self::CycleStart { minimum } => write!(f, "minimum cycle is {} instead of 1", minimum),
            Self::StepStart { minimum } => write!(f, "minimum step is {} instead of 1", minimum),
            Self::StepDecreasing {
                index,
                previous,
                step,
            } => write!(f, "step drops from {} to {} at index {}", previous, step, index),
            Self::VoltageTooLow {
                index,
                voltage_v,
                limit_v,
            } => write!(
                f,
                "voltage {:.4} V at index {} is below {:.2} V",
                voltage_v, index, limit_v
            ),
            Self::NegativeCapacity { index } => write!(f, "negative capacity at index {}", index),
            Self::NegativeEnergy { index } => write!(f, "negative energy at index {}", index),
            Self::CapacityCeiling {
                maximum_ah,
                ceiling_ah,
            } => write!(
                f,
                "maximum capacity {:.3} Ah exceeds ceiling {:.3} Ah",
                maximum_ah, ceiling_ah
            ),
            Self::CurrentCeiling {
                maximum_a,
                ceiling_a,
            } => write!(
                f,
                "maximum |current| {:.3} A exceeds ceiling {:.3} A",
                maximum_a, ceiling_a
            ),
            Self::ControlCharacters { field } => {
                write!(f, "control characters in metadata field '{}'", field)
            }
            Self::BarcodeLength { actual, expected } => {
                write!(f, "barcode has {} characters, expected {}", actual, expected)
            }
            Self::FlaggedRows { count } => {
                write!(f, "{} rows failed the continuity pre-pass", count)
            }
        }
    }
}

/// Verdict and pre-pass counts
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationReport {
    pub passed: bool,
    pub failure: Option<ValidationFailure>,
    /// Rows cleared because elapsed time and timestamp disagree
    pub timegap_rows: usize,
    /// Rest rows cleared because they carry current
    pub rest_current_rows: usize,
}

impl ValidationReport {
    pub fn flagged_rows(&self) -> usize {
        self.timegap_rows + self.rest_current_rows
    }

    pub fn summary(&self) -> String {
        let verdict = match &self.failure {
            None => "passed".to_string(),
            Some(failure) => format!("failed ({})", failure),
        };
        format!(
            "Validation {} | Timegap rows: {} | Rest-current rows: {}",
            verdict, self.timegap_rows, self.rest_current_rows
        )
    }
}

/// The series with its flags updated, and the verdict
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub records: Vec<Record>,
    pub report: ValidationReport,
}
