//! Decode pipeline for a single NDAX archive
//!
//! Runs the stages in order: extraction, record decoding, reconstruction of
//! split-stream rows, validation, DCIR derivation and optional gap-cycle
//! dropping. The summaries (steps, cycles, recipes) are derived on demand
//! from the decoded series. The `get_*` free functions each open the archive
//! themselves and are the simplest entry points.

use crate::app::models::{CycleSummary, Record, StepSummary, TestMetadata};
use crate::app::services::aggregator::{Aggregator, derive_dcir, drop_cycles_with_index_gaps};
use crate::app::services::archive::{FormatVariant, MetadataReader, NdaxArchive, or_sentinel};
use crate::app::services::record_decoder::{DecodeStats, DecodedRows};
use crate::app::services::recipe_classifier::{RecipeClassifier, RecipeReport};
use crate::app::services::series_fabricator::{FabricationReport, SeriesFabricator};
use crate::app::services::validator::{ValidationReport, Validator};
use crate::config::{ArchiveConfig, DecoderConfig};
use crate::constants::{members, sentinels};
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything produced by decoding one archive
#[derive(Debug, Clone)]
pub struct DecodedTest {
    pub source: PathBuf,
    pub format: FormatVariant,
    /// Validated series in index order
    pub records: Vec<Record>,
    pub validation: ValidationReport,
    pub metadata: TestMetadata,
    pub stats: DecodeStats,
    /// Present for split-stream archives only
    pub fabrication: Option<FabricationReport>,
    /// Rows that received a DCIR value
    pub dcir_rows: usize,
    /// Cycles removed next to index gaps
    pub dropped_cycles: BTreeSet<u32>,
    pub decode_time_ms: u128,
}

impl DecodedTest {
    /// Summary line for logging
    pub fn summary(&self) -> String {
        format!(
            "{}: {} records over {} cycles ({} format) | {} | {}ms",
            self.source.display(),
            self.records.len(),
            self.cycle_count(),
            self.format,
            if self.validation.passed { "valid" } else { "invalid" },
            self.decode_time_ms
        )
    }

    pub fn cycle_count(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.cycle)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Orchestrates the decoding stages
#[derive(Debug, Clone, Default)]
pub struct NdaxDecoder {
    config: DecoderConfig,
}

impl NdaxDecoder {
    /// Create a decoder, rejecting unusable settings
    pub fn new(config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode one archive into a validated series
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the `.ndax` file
    ///
    /// # Returns
    ///
    /// The decoded test. A failed validation verdict is reported in
    /// `validation` rather than as an error; archive, layout and code-table
    /// problems are errors.
    pub fn decode_file(&self, path: impl AsRef<Path>) -> Result<DecodedTest> {
        let path = path.as_ref();
        let start = Instant::now();

        let archive = NdaxArchive::open(path, &self.config.archive)?;
        let format = archive
            .format()
            .ok_or_else(|| Error::missing_member(members::DATA))?;
        let decoded = format.source(&self.config).decode(&archive)?;
        let mut stats = decoded.stats;

        let (records, fabrication) = match decoded.rows {
            DecodedRows::Complete(records) => (records, None),
            DecodedRows::Partial(rows) => {
                let outcome = SeriesFabricator::new().fabricate(rows);
                stats.fabricated_rows = outcome.report.fabricated_rows;
                stats.dropped_incomplete += outcome.report.dropped_rows;
                info!("{}", outcome.report.summary());
                (outcome.records, Some(outcome.report))
            }
        };
        info!("{}", stats.summary());

        let metadata = match MetadataReader::new(&archive).read_all() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Metadata unavailable for {}: {}", path.display(), e);
                TestMetadata::default()
            }
        };
        archive.close();

        let validator = Validator::new(self.config.validation.clone());
        let outcome = validator.validate(records, Some(&metadata));
        let (mut records, dcir_rows) = derive_dcir(outcome.records);

        let mut dropped_cycles = BTreeSet::new();
        if self.config.drop_cycles_with_index_gaps {
            let (kept, dropped) = drop_cycles_with_index_gaps(records);
            records = kept;
            dropped_cycles = dropped;
            if !dropped_cycles.is_empty() {
                info!("Dropped cycles next to index gaps: {:?}", dropped_cycles);
            }
        }

        let test = DecodedTest {
            source: path.to_path_buf(),
            format,
            records,
            validation: outcome.report,
            metadata,
            stats,
            fabrication,
            dcir_rows,
            dropped_cycles,
            decode_time_ms: start.elapsed().as_millis(),
        };
        debug!("{}", test.summary());
        Ok(test)
    }

    /// Step summaries of a decoded test
    pub fn steps(&self, test: &DecodedTest) -> Vec<StepSummary> {
        Aggregator::new(self.config.aggregation.clone()).steps(&test.records)
    }

    /// Cycle summaries of a decoded test
    pub fn cycles(&self, test: &DecodedTest) -> Vec<CycleSummary> {
        Aggregator::new(self.config.aggregation.clone()).cycles(&test.records)
    }

    /// Recipe groups of a decoded test
    pub fn recipes(&self, test: &DecodedTest) -> RecipeReport {
        RecipeClassifier::new(self.config.recipe.clone(), self.config.aggregation.clone())
            .classify(&test.records)
    }
}

// =============================================================================
// Free Functions
// =============================================================================

/// Decoded, validated record series of an archive
pub fn get_records(path: impl AsRef<Path>, config: &DecoderConfig) -> Result<Vec<Record>> {
    Ok(NdaxDecoder::new(config.clone())?.decode_file(path)?.records)
}

/// Step summaries of an archive
pub fn get_steps(path: impl AsRef<Path>, config: &DecoderConfig) -> Result<Vec<StepSummary>> {
    let decoder = NdaxDecoder::new(config.clone())?;
    let test = decoder.decode_file(path)?;
    Ok(decoder.steps(&test))
}

/// Cycle summaries of an archive
pub fn get_cycles(path: impl AsRef<Path>, config: &DecoderConfig) -> Result<Vec<CycleSummary>> {
    let decoder = NdaxDecoder::new(config.clone())?;
    let test = decoder.decode_file(path)?;
    Ok(decoder.cycles(&test))
}

/// Recipe groups of an archive
pub fn get_recipes(path: impl AsRef<Path>, config: &DecoderConfig) -> Result<RecipeReport> {
    let decoder = NdaxDecoder::new(config.clone())?;
    let test = decoder.decode_file(path)?;
    Ok(decoder.recipes(&test))
}

fn read_field<F>(path: &Path, sentinel: &str, field: F) -> Result<String>
where
    F: Fn(&MetadataReader) -> Result<Option<String>>,
{
    let archive = NdaxArchive::open_metadata(path, &ArchiveConfig::default())?;
    let value = field(&MetadataReader::new(&archive))?;
    Ok(or_sentinel(value, sentinel))
}

/// Cell barcode, or a "not found" sentinel
pub fn get_barcode(path: impl AsRef<Path>) -> Result<String> {
    read_field(path.as_ref(), sentinels::BARCODE, |reader| reader.barcode())
}

/// Step program name, or a "not found" sentinel
pub fn get_process_name(path: impl AsRef<Path>) -> Result<String> {
    read_field(path.as_ref(), sentinels::PROCESS_NAME, |reader| {
        reader.process_name()
    })
}

/// Free-text remark, or a "not found" sentinel
pub fn get_remarks(path: impl AsRef<Path>) -> Result<String> {
    read_field(path.as_ref(), sentinels::REMARK, |reader| reader.remark())
}

/// Test start time as written by the instrument, or a "not found" sentinel
pub fn get_start_time(path: impl AsRef<Path>) -> Result<String> {
    read_field(path.as_ref(), sentinels::START_TIME, |reader| {
        reader.start_time()
    })
}
