//! Archive extraction module for NDAX files
//!
//! An NDAX file is a ZIP container holding one or three binary telemetry
//! streams (`*.ndc`) and a handful of XML metadata members. This module opens
//! the container into a scoped working area, decides which binary layout
//! family it belongs to and serves the metadata fields.
//!
//! # Architecture
//!
//! - [`extractor`] - [`NdaxArchive`] and [`FormatVariant`] detection
//! - [`working_area`] - Scoped extraction directory with retrying cleanup
//! - [`metadata`] - GBK-aware XML attribute lookups with fallbacks
//!
//! # Lifecycle
//!
//! Every call to [`NdaxArchive::open`] gets its own working area, so
//! concurrent decodes never share extracted files. The area is emptied when
//! the archive handle is dropped, including when decoding fails part-way.

pub mod extractor;
pub mod metadata;
pub mod working_area;

pub use extractor::{FormatVariant, NdaxArchive};
pub use metadata::{MetadataReader, decode_xml_text, or_sentinel};
pub use working_area::WorkingArea;

#[cfg(test)]
pub mod tests;
