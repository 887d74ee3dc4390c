//! Configuration management and validation.
//!
//! Provides configuration structures for each decoding stage: archive
//! extraction, timestamp normalisation, validation, aggregation and recipe
//! classification. Every structure carries defaults that reproduce the
//! instrument software's reference behaviour, plus `with_*` builders for the
//! knobs callers commonly turn.

use crate::constants::{self, validation};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Archive extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Caller-supplied working directory; a fresh temporary directory is used when `None`
    pub work_dir: Option<PathBuf>,

    /// Pause before retrying a failed cleanup (milliseconds)
    pub cleanup_retry_pause_ms: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            work_dir: None,
            cleanup_retry_pause_ms: constants::CLEANUP_RETRY_PAUSE_MS,
        }
    }
}

/// Offsets applied to split-stream unix timestamps
///
/// The instrument writes seconds that are read as naive UTC, localised at
/// `source_offset_s`, converted to `target_offset_s` and stripped of zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimezoneConfig {
    pub source_offset_s: i32,
    pub target_offset_s: i32,
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        Self {
            source_offset_s: constants::DEFAULT_SOURCE_OFFSET_S,
            target_offset_s: constants::DEFAULT_TARGET_OFFSET_S,
        }
    }
}

impl TimezoneConfig {
    /// Net shift applied to a naive timestamp, in seconds
    pub fn shift_seconds(&self) -> i64 {
        i64::from(self.target_offset_s) - i64::from(self.source_offset_s)
    }
}

/// Which set of invariants the validator enforces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum ValidationProfile {
    /// Structural checks only
    #[default]
    Basic,
    /// Structural plus physical-plausibility and metadata checks
    Full { nominal_capacity_ah: f64 },
}

/// Validator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub profile: ValidationProfile,

    /// Allowed disagreement between elapsed-time and timestamp deltas (seconds)
    pub timegap_tolerance_s: f64,

    /// Treat rows flagged by the timegap or rest-current pre-pass as a verdict failure
    pub fail_on_timegap: bool,

    /// Minimum voltage for non-simulation rows (full profile)
    pub min_voltage_v: f64,

    pub capacity_ceiling_factor: f64,
    pub current_ceiling_factor: f64,

    /// Required barcode length when metadata is checked
    pub barcode_len: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            profile: ValidationProfile::Basic,
            timegap_tolerance_s: validation::TIMEGAP_TOLERANCE_S,
            fail_on_timegap: false,
            min_voltage_v: validation::MIN_VOLTAGE_V,
            capacity_ceiling_factor: validation::CAPACITY_CEILING_FACTOR,
            current_ceiling_factor: validation::CURRENT_CEILING_FACTOR,
            barcode_len: validation::BARCODE_LEN,
        }
    }
}

impl ValidationConfig {
    /// Use the full profile with the given nominal capacity
    pub fn with_full_profile(mut self, nominal_capacity_ah: f64) -> Self {
        self.profile = ValidationProfile::Full {
            nominal_capacity_ah,
        };
        self
    }

    /// Set the timegap tolerance
    pub fn with_timegap_tolerance(mut self, tolerance_s: f64) -> Self {
        self.timegap_tolerance_s = tolerance_s;
        self
    }

    /// Fail the verdict when the pre-pass clears any flag
    pub fn with_fail_on_timegap(mut self) -> Self {
        self.fail_on_timegap = true;
        self
    }
}

/// Step and cycle aggregation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Step-type label treated as the charge step
    pub charge_label: String,

    /// Step-type label treated as the discharge step
    pub discharge_label: String,

    /// Summarise the last cycle only when it has the modal per-cycle row count
    pub drop_incomplete_last_cycle: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            charge_label: constants::DEFAULT_CHARGE_LABEL.to_string(),
            discharge_label: constants::DEFAULT_DISCHARGE_LABEL.to_string(),
            drop_incomplete_last_cycle: false,
        }
    }
}

impl AggregationConfig {
    /// Override the charge/discharge labels
    pub fn with_labels(
        mut self,
        charge_label: impl Into<String>,
        discharge_label: impl Into<String>,
    ) -> Self {
        self.charge_label = charge_label.into();
        self.discharge_label = discharge_label.into();
        self
    }

    /// Drop a trailing cycle whose row count differs from the modal count
    pub fn with_drop_incomplete_last_cycle(mut self) -> Self {
        self.drop_incomplete_last_cycle = true;
        self
    }
}

/// How recipe groups are named
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RecipeNaming {
    /// `<prefix>-<representative cycle>`
    #[default]
    RepresentativeCycle,
    /// `<prefix>-1`, `<prefix>-2`, ... in order of first appearance
    Sequential,
}

/// Recipe classifier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeConfig {
    /// Largest absolute difference at which two numeric signature fields still match
    pub tolerance: f64,
    pub naming: RecipeNaming,
    pub prefix: String,
}

impl Default for RecipeConfig {
    fn default() -> Self {
        Self {
            tolerance: constants::DEFAULT_RECIPE_TOLERANCE,
            naming: RecipeNaming::RepresentativeCycle,
            prefix: constants::DEFAULT_RECIPE_PREFIX.to_string(),
        }
    }
}

impl RecipeConfig {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_naming(mut self, naming: RecipeNaming) -> Self {
        self.naming = naming;
        self
    }
}

/// Global configuration for NDAX decoding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Decode auxiliary channel records and join their temperature
    pub include_aux: bool,

    /// Keep the instrument's per-cycle step id alongside the monotonic step
    pub keep_raw_step_id: bool,

    /// Remove cycles adjacent to gaps in the record index
    pub drop_cycles_with_index_gaps: bool,

    pub archive: ArchiveConfig,
    pub timezone: TimezoneConfig,
    pub validation: ValidationConfig,
    pub aggregation: AggregationConfig,
    pub recipe: RecipeConfig,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            include_aux: false,
            keep_raw_step_id: false,
            drop_cycles_with_index_gaps: false,
            archive: ArchiveConfig::default(),
            timezone: TimezoneConfig::default(),
            validation: ValidationConfig::default(),
            aggregation: AggregationConfig::default(),
            recipe: RecipeConfig::default(),
        }
    }
}

impl DecoderConfig {
    /// Decode auxiliary channels
    pub fn with_aux(mut self) -> Self {
        self.include_aux = true;
        self
    }

    /// Keep the raw per-cycle step id
    pub fn with_raw_step_id(mut self) -> Self {
        self.keep_raw_step_id = true;
        self
    }

    /// Drop cycles next to index gaps before aggregation
    pub fn with_gap_cycle_dropping(mut self) -> Self {
        self.drop_cycles_with_index_gaps = true;
        self
    }

    /// Extract into a caller-supplied directory instead of a temporary one
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.archive.work_dir = Some(work_dir.into());
        self
    }

    pub fn with_timezone(mut self, timezone: TimezoneConfig) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_aggregation(mut self, aggregation: AggregationConfig) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_recipe(mut self, recipe: RecipeConfig) -> Self {
        self.recipe = recipe;
        self
    }

    /// Reject settings no decode could honour
    pub fn validate(&self) -> Result<()> {
        if let ValidationProfile::Full {
            nominal_capacity_ah,
        } = self.validation.profile
        {
            if !(nominal_capacity_ah.is_finite() && nominal_capacity_ah > 0.0) {
                return Err(Error::configuration(format!(
                    "nominal capacity must be positive, got {}",
                    nominal_capacity_ah
                )));
            }
        }
        if !(self.validation.timegap_tolerance_s >= 0.0) {
            return Err(Error::configuration("timegap tolerance must be non-negative"));
        }
        if !(self.recipe.tolerance >= 0.0) {
            return Err(Error::configuration("recipe tolerance must be non-negative"));
        }
        if self.aggregation.charge_label.is_empty() || self.aggregation.discharge_label.is_empty()
        {
            return Err(Error::configuration("charge/discharge labels must not be empty"));
        }

        debug!(
            "Decoder configuration accepted: aux={}, profile={:?}",
            self.include_aux, self.validation.profile
        );
        Ok(())
    }
}
