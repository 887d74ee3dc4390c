//! DataFrame adapter for decoded series and summaries
//!
//! Builds polars frames from records, step and cycle summaries and recipe
//! reports, converts record frames between the three column-naming sets in
//! use, and writes frames to Parquet or CSV. Renaming never touches values.

use crate::app::models::{CycleSummary, PolaritySummary, Record, StepSummary};
use crate::app::services::recipe_classifier::RecipeReport;
use crate::app::transforms::format_hms;
use crate::constants::columns;
use crate::{Error, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

// =============================================================================
// Column Naming
// =============================================================================

/// Column-naming set for record frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnNaming {
    #[default]
    Canonical,
    BtsClient,
    Spreadsheet,
}

impl ColumnNaming {
    pub fn all() -> [ColumnNaming; 3] {
        [Self::Canonical, Self::BtsClient, Self::Spreadsheet]
    }

    /// Column names in frame order
    pub fn names(self) -> &'static [&'static str; 13] {
        match self {
            Self::Canonical => &columns::CANONICAL,
            Self::BtsClient => &columns::BTS_CLIENT,
            Self::Spreadsheet => &columns::SPREADSHEET,
        }
    }

    /// Identify the naming set whose required columns are all present
    pub fn detect<S: AsRef<str>>(present: &[S]) -> Option<Self> {
        Self::all().into_iter().find(|naming| {
            naming.names()[..columns::REQUIRED]
                .iter()
                .all(|name| present.iter().any(|p| p.as_ref() == *name))
        })
    }

    /// Identify the naming set of a frame
    pub fn detect_frame(df: &DataFrame) -> Option<Self> {
        let present: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        Self::detect(&present)
    }
}

impl fmt::Display for ColumnNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Canonical => "canonical",
            Self::BtsClient => "bts",
            Self::Spreadsheet => "spreadsheet",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ColumnNaming {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "canonical" => Ok(Self::Canonical),
            "bts" | "bts-client" | "btsclient" => Ok(Self::BtsClient),
            "spreadsheet" | "excel" => Ok(Self::Spreadsheet),
            other => Err(format!(
                "unknown column naming '{}' (expected canonical, bts or spreadsheet)",
                other
            )),
        }
    }
}

/// Rename a record frame into another naming set
///
/// # Arguments
///
/// * `df` - Record frame in any known naming set
/// * `to` - Target naming set
///
/// # Returns
///
/// The same frame with columns renamed, or a configuration error when the
/// frame's naming set cannot be identified
pub fn rename_frame(mut df: DataFrame, to: ColumnNaming) -> Result<DataFrame> {
    let from = ColumnNaming::detect_frame(&df).ok_or_else(|| {
        Error::configuration("frame columns do not match any known naming set")
    })?;
    if from == to {
        return Ok(df);
    }

    for (old, new) in from.names().iter().zip(to.names().iter()) {
        let present = df.get_column_names().iter().any(|n| n.as_str() == *old);
        if present && old != new {
            df.rename(old, (*new).into())
                .map_err(|e| Error::frame(format!("Failed to rename column '{}'", old), e))?;
        }
    }
    debug!("Renamed record frame from {} to {} naming", from, to);
    Ok(df)
}

// =============================================================================
// Frame Builders
// =============================================================================

fn build(name: &str, cols: Vec<Column>) -> Result<DataFrame> {
    DataFrame::new(cols).map_err(|e| Error::frame(format!("Failed to build {} frame", name), e))
}

/// Record frame in the requested naming set
///
/// The DCIR and temperature columns are included only when some row carries
/// a value; the raw step id column only when it was kept.
pub fn records_frame(records: &[Record], naming: ColumnNaming) -> Result<DataFrame> {
    let names = naming.names();
    let mut cols = vec![
        Column::new(names[0].into(), records.iter().map(|r| r.index).collect::<Vec<u32>>()),
        Column::new(names[1].into(), records.iter().map(|r| r.cycle).collect::<Vec<u32>>()),
        Column::new(names[2].into(), records.iter().map(|r| r.step).collect::<Vec<u32>>()),
        Column::new(
            names[3].into(),
            records.iter().map(|r| r.status.name()).collect::<Vec<&str>>(),
        ),
        Column::new(
            names[4].into(),
            records.iter().map(|r| r.elapsed_time_s).collect::<Vec<f64>>(),
        ),
        Column::new(names[5].into(), records.iter().map(|r| r.voltage_v).collect::<Vec<f64>>()),
        Column::new(names[6].into(), records.iter().map(|r| r.current_a).collect::<Vec<f64>>()),
        Column::new(names[7].into(), records.iter().map(|r| r.capacity_ah).collect::<Vec<f64>>()),
        Column::new(names[8].into(), records.iter().map(|r| r.energy_wh).collect::<Vec<f64>>()),
        Column::new(
            names[9].into(),
            records.iter().map(|r| r.timestamp).collect::<Vec<_>>(),
        ),
        Column::new(names[10].into(), records.iter().map(|r| r.validated).collect::<Vec<bool>>()),
    ];

    if records.iter().any(|r| r.dcir_mohm.is_some()) {
        cols.push(Column::new(
            names[11].into(),
            records.iter().map(|r| r.dcir_mohm).collect::<Vec<Option<f64>>>(),
        ));
    }
    if records.iter().any(|r| r.aux_temperature_c.is_some()) {
        cols.push(Column::new(
            names[12].into(),
            records.iter().map(|r| r.aux_temperature_c).collect::<Vec<Option<f64>>>(),
        ));
    }
    if records.iter().any(|r| r.step_number.is_some()) {
        cols.push(Column::new(
            columns::STEP_ID.into(),
            records.iter().map(|r| r.step_number).collect::<Vec<Option<u32>>>(),
        ));
    }

    build("record", cols)
}

/// One row per step
pub fn steps_frame(steps: &[StepSummary]) -> Result<DataFrame> {
    let names = &columns::STEP_SUMMARY;
    build(
        "step",
        vec![
            Column::new(names[0].into(), steps.iter().map(|s| s.cycle).collect::<Vec<u32>>()),
            Column::new(names[1].into(), steps.iter().map(|s| s.step).collect::<Vec<u32>>()),
            Column::new(
                names[2].into(),
                steps.iter().map(|s| s.step_type.name()).collect::<Vec<&str>>(),
            ),
            Column::new(
                names[3].into(),
                steps.iter().map(|s| format_hms(s.duration_s)).collect::<Vec<String>>(),
            ),
            Column::new(names[4].into(), steps.iter().map(|s| s.start_time).collect::<Vec<_>>()),
            Column::new(names[5].into(), steps.iter().map(|s| s.end_time).collect::<Vec<_>>()),
            Column::new(names[6].into(), steps.iter().map(|s| s.capacity_ah).collect::<Vec<f64>>()),
            Column::new(names[7].into(), steps.iter().map(|s| s.energy_wh).collect::<Vec<f64>>()),
            Column::new(
                names[8].into(),
                steps.iter().map(|s| s.start_voltage_v).collect::<Vec<f64>>(),
            ),
            Column::new(
                names[9].into(),
                steps.iter().map(|s| s.end_voltage_v).collect::<Vec<f64>>(),
            ),
            Column::new(
                names[10].into(),
                steps.iter().map(|s| s.start_current_a).collect::<Vec<f64>>(),
            ),
            Column::new(
                names[11].into(),
                steps.iter().map(|s| s.end_current_a).collect::<Vec<f64>>(),
            ),
            Column::new(
                names[12].into(),
                steps.iter().map(|s| s.max_voltage_v).collect::<Vec<f64>>(),
            ),
            Column::new(
                names[13].into(),
                steps.iter().map(|s| s.min_voltage_v).collect::<Vec<f64>>(),
            ),
            Column::new(
                names[14].into(),
                steps.iter().map(|s| s.dcir_mohm).collect::<Vec<Option<f64>>>(),
            ),
        ],
    )
}

fn polarity_column<T, F>(name: &str, cycles: &[CycleSummary], charge: bool, field: F) -> Column
where
    F: Fn(&PolaritySummary) -> T,
    Series: NamedFrom<Vec<Option<T>>, [Option<T>]>,
{
    let values: Vec<Option<T>> = cycles
        .iter()
        .map(|c| {
            let polarity = if charge { &c.charge } else { &c.discharge };
            polarity.as_ref().map(&field)
        })
        .collect();
    Column::new(name.into(), values)
}

/// One row per cycle; a missing polarity leaves its columns null
pub fn cycles_frame(cycles: &[CycleSummary]) -> Result<DataFrame> {
    let names = &columns::CYCLE_SUMMARY;
    let hms = |p: &PolaritySummary| format_hms(p.duration_s);
    build(
        "cycle",
        vec![
            Column::new(names[0].into(), cycles.iter().map(|c| c.cycle).collect::<Vec<u32>>()),
            Column::new(names[1].into(), cycles.iter().map(|c| c.start_time).collect::<Vec<_>>()),
            Column::new(names[2].into(), cycles.iter().map(|c| c.end_time).collect::<Vec<_>>()),
            polarity_column(names[3], cycles, true, |p| p.capacity_ah),
            polarity_column(names[4], cycles, false, |p| p.capacity_ah),
            polarity_column(names[5], cycles, true, |p| p.energy_wh),
            polarity_column(names[6], cycles, false, |p| p.energy_wh),
            polarity_column(names[7], cycles, true, hms),
            polarity_column(names[8], cycles, false, hms),
            polarity_column(names[9], cycles, true, |p| p.onset_voltage_v),
            polarity_column(names[10], cycles, false, |p| p.onset_voltage_v),
            polarity_column(names[11], cycles, true, |p| p.terminal_voltage_v),
            polarity_column(names[12], cycles, false, |p| p.terminal_voltage_v),
            polarity_column(names[13], cycles, true, |p| p.onset_current_a),
            polarity_column(names[14], cycles, false, |p| p.onset_current_a),
            polarity_column(names[15], cycles, true, |p| p.terminal_current_a),
            polarity_column(names[16], cycles, false, |p| p.terminal_current_a),
            Column::new(
                names[17].into(),
                cycles.iter().map(|c| c.average_dcir_mohm).collect::<Vec<Option<f64>>>(),
            ),
            Column::new(
                names[18].into(),
                cycles
                    .iter()
                    .map(CycleSummary::coulombic_efficiency)
                    .collect::<Vec<Option<f64>>>(),
            ),
        ],
    )
}

/// Format inclusive cycle runs as `1-3, 6, 8-9`
pub fn format_ranges(ranges: &[(u32, u32)]) -> String {
    ranges
        .iter()
        .map(|(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{}-{}", start, end)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// One row per step of each recipe's protocol
pub fn recipe_frame(report: &RecipeReport) -> Result<DataFrame> {
    let mut recipe = Vec::new();
    let mut cycles = Vec::new();
    let mut step = Vec::new();
    let mut status = Vec::new();
    let mut voltage = Vec::new();
    let mut current = Vec::new();
    let mut rest = Vec::new();
    let mut cutoff_current = Vec::new();
    let mut cutoff_voltage = Vec::new();

    for (name, ranges) in &report.ranges {
        let cycle_text = format_ranges(ranges);
        for (i, signature) in report.protocol(name).unwrap_or_default().iter().enumerate() {
            recipe.push(name.clone());
            cycles.push(cycle_text.clone());
            step.push(i as u32 + 1);
            status.push(signature.status.name());
            voltage.push(signature.voltage_v);
            current.push(signature.current_a);
            rest.push(format_hms(signature.rest_time_s));
            cutoff_current.push(signature.cutoff_current_a);
            cutoff_voltage.push(signature.cutoff_voltage_v);
        }
    }

    let names = &columns::RECIPE;
    build(
        "recipe",
        vec![
            Column::new(names[0].into(), recipe),
            Column::new(names[1].into(), cycles),
            Column::new(names[2].into(), step),
            Column::new(names[3].into(), status),
            Column::new(names[4].into(), voltage),
            Column::new(names[5].into(), current),
            Column::new(names[6].into(), rest),
            Column::new(names[7].into(), cutoff_current),
            Column::new(names[8].into(), cutoff_voltage),
        ],
    )
}

// =============================================================================
// Writers
// =============================================================================

fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| Error::io(format!("Failed to create {}", path.display()), e))
}

/// Write a frame as Parquet
pub fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = create(path)?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Snappy)
        .finish(df)
        .map_err(|e| Error::frame(format!("Failed to write {}", path.display()), e))?;
    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Write a frame as CSV with a header row
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = create(path)?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(df)
        .map_err(|e| Error::frame(format!("Failed to write {}", path.display()), e))?;
    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}
