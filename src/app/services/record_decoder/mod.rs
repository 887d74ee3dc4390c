//! Binary record decoding for NDAX telemetry streams
//!
//! This module turns the extracted `*.ndc` members into a row sequence. The
//! two format variants implement one contract, [`SeriesSource`], and the
//! variant is chosen once from the archive's [`FormatVariant`].
//!
//! # Architecture
//!
//! - [`single_stream`] - Sync-scanning decoder for the consolidated stream
//! - [`split_stream`] - Block decoder and join for the three-file layout
//! - [`aux_channel`] - Auxiliary temperature records and their join
//! - [`layout`] - Little-endian field readers and the current-range table
//! - [`stats`] - Decode counters
//!
//! # Output
//!
//! The single-stream variant yields complete [`Record`]s. The split-stream
//! variant yields [`PartialRecord`]s whose gaps the series fabricator fills;
//! both end up in the same schema before validation.

pub mod aux_channel;
pub mod layout;
pub mod single_stream;
pub mod split_stream;
pub mod stats;

pub use aux_channel::{decode_aux, join_aux};
pub use layout::current_multiplier;
pub use single_stream::{SingleStreamDecoder, SingleStreamLayout};
pub use split_stream::SplitStreamDecoder;
pub use stats::DecodeStats;

use crate::Result;
use crate::app::models::{AuxRecord, PartialRecord, Record};
use crate::app::services::archive::{FormatVariant, NdaxArchive};
use crate::config::DecoderConfig;
use crate::constants::members;

/// Rows as produced by a format variant
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedRows {
    /// Every field decoded from the stream
    Complete(Vec<Record>),
    /// Joined rows with fields the run-info stream omitted
    Partial(Vec<PartialRecord>),
}

impl DecodedRows {
    pub fn len(&self) -> usize {
        match self {
            Self::Complete(rows) => rows.len(),
            Self::Partial(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of decoding one archive's binary members
#[derive(Debug, Clone)]
pub struct DecodedSeries {
    pub rows: DecodedRows,
    /// Auxiliary rows as decoded, before de-duplication
    pub aux: Vec<AuxRecord>,
    pub stats: DecodeStats,
}

/// Decode contract shared by the format variants
pub trait SeriesSource {
    fn decode(&self, archive: &NdaxArchive) -> Result<DecodedSeries>;
}

impl SeriesSource for SingleStreamDecoder {
    fn decode(&self, archive: &NdaxArchive) -> Result<DecodedSeries> {
        let path = archive.require_member(members::DATA)?;
        let output = self.decode_file(&path)?;
        let records = if self.include_aux {
            join_aux(output.records, &output.aux)
        } else {
            output.records
        };
        Ok(DecodedSeries {
            rows: DecodedRows::Complete(records),
            aux: output.aux,
            stats: output.stats,
        })
    }
}

impl SeriesSource for SplitStreamDecoder {
    fn decode(&self, archive: &NdaxArchive) -> Result<DecodedSeries> {
        let data = archive.require_member(members::DATA)?;
        let run_info = archive.require_member(members::RUN_INFO)?;
        let step = archive.require_member(members::STEP)?;
        let output = self.decode_files(&data, &run_info, &step)?;
        Ok(DecodedSeries {
            rows: DecodedRows::Partial(output.rows),
            aux: Vec::new(),
            stats: output.stats,
        })
    }
}

impl FormatVariant {
    /// The decoder for this variant, configured from `config`
    pub fn source(self, config: &DecoderConfig) -> Box<dyn SeriesSource> {
        match self {
            Self::SingleStream => Box::new(SingleStreamDecoder::new(
                config.include_aux,
                config.keep_raw_step_id,
            )),
            Self::SplitStream => Box::new(SplitStreamDecoder::new(
                config.timezone,
                config.keep_raw_step_id,
            )),
        }
    }
}

#[cfg(test)]
pub mod tests;
