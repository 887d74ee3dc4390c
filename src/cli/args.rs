//! Command-line argument definitions for the NDAX decoder
//!
//! The binary takes one archive, runs the decode pipeline and prints or
//! exports the resulting tables.

use crate::app::adapters::frame::ColumnNaming;
use crate::config::{DecoderConfig, ValidationConfig};
use crate::{Error, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the NDAX decoder
///
/// Decodes a battery-cycler NDAX archive into a validated time series and
/// summarises it by step, cycle and recipe.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ndax",
    version,
    about = "Decode NDAX battery-cycler archives into validated time series",
    long_about = "Decodes the binary telemetry of an NDAX archive (single- or split-stream), \
                  reconstructs incomplete rows, validates the series and prints step, cycle \
                  and recipe summaries. Tables can be exported as Parquet or CSV."
)]
pub struct Args {
    /// Path to the `.ndax` archive
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Decode auxiliary channels and join their temperature
    #[arg(long = "aux", help = "Join auxiliary temperature channels")]
    pub aux: bool,

    /// Validation profile
    ///
    /// `full` adds physical-plausibility and metadata checks and needs
    /// `--nominal-capacity`.
    #[arg(
        long = "profile",
        value_enum,
        default_value = "basic",
        help = "Validation profile"
    )]
    pub profile: Profile,

    /// Nominal cell capacity in ampere-hours (full profile)
    #[arg(
        long = "nominal-capacity",
        value_name = "AH",
        help = "Nominal capacity in Ah, required by the full profile"
    )]
    pub nominal_capacity: Option<f64>,

    /// Column-naming set for the exported record table
    #[arg(
        long = "naming",
        value_name = "NAMING",
        default_value = "canonical",
        help = "Record column names: canonical, bts or spreadsheet"
    )]
    pub naming: ColumnNaming,

    /// Directory the tables are written to
    ///
    /// Files are named after the archive: `<stem>_records`, `<stem>_steps`,
    /// `<stem>_cycles` and `<stem>_recipes`.
    #[arg(
        short = 'o',
        long = "export-dir",
        value_name = "DIR",
        help = "Export tables to this directory"
    )]
    pub export_dir: Option<PathBuf>,

    /// File format for exported tables
    #[arg(
        long = "format",
        value_enum,
        default_value = "parquet",
        help = "Export file format"
    )]
    pub format: ExportFormat,

    /// Enable verbose logging output
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,
}

/// Validation profile selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    Basic,
    Full,
}

/// Export file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Parquet,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::Csv => "csv",
        }
    }
}

impl Args {
    /// Check argument consistency
    pub fn validate(&self) -> Result<()> {
        if !self.file.exists() {
            return Err(Error::configuration(format!(
                "Archive does not exist: {}",
                self.file.display()
            )));
        }
        if self.profile == Profile::Full && self.nominal_capacity.is_none() {
            return Err(Error::configuration(
                "--profile full requires --nominal-capacity",
            ));
        }
        if let Some(dir) = &self.export_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(Error::configuration(format!(
                    "Export path is not a directory: {}",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    /// Decoder configuration implied by the arguments
    pub fn to_config(&self) -> DecoderConfig {
        let mut validation = ValidationConfig::default();
        if let (Profile::Full, Some(nominal)) = (self.profile, self.nominal_capacity) {
            validation = validation.with_full_profile(nominal);
        }

        let config = DecoderConfig::default().with_validation(validation);
        if self.aux { config.with_aux() } else { config }
    }

    pub fn get_log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Stem used to name exported files
    pub fn export_stem(&self) -> String {
        self.file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ndax".to_string())
    }
}
