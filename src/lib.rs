//! NDAX Decoder Library
//!
//! A Rust library for decoding NDAX battery-cycler archives into a validated
//! time series of electrochemical measurements, and for summarising that
//! series at step, cycle and protocol ("recipe") level.
//!
//! This library provides tools for:
//! - Extracting the ZIP container into a scoped working area
//! - Decoding single-stream and split-stream binary record layouts
//! - Joining auxiliary temperature channels
//! - Reconstructing rows the split-stream format leaves incomplete
//! - Validating the series against structural and physical invariants
//! - Step and cycle aggregation, DCIR derivation and recipe classification
//! - Exporting results as polars DataFrames (Parquet/CSV)

pub mod config;
pub mod constants;
pub mod pipeline;

// Core application modules
pub mod app {
    pub mod models;
    pub mod transforms;
    pub mod services {
        pub mod aggregator;
        pub mod archive;
        pub mod record_decoder;
        pub mod recipe_classifier;
        pub mod series_fabricator;
        pub mod validator;
    }
    pub mod adapters {
        pub mod frame;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{
    CycleSummary, PolaritySummary, Record, RecipeStep, StepState, StepSummary, TestMetadata,
};
pub use config::DecoderConfig;
pub use pipeline::{
    DecodedTest, NdaxDecoder, get_barcode, get_cycles, get_process_name, get_recipes,
    get_records, get_remarks, get_start_time, get_steps,
};

/// Result type alias for the NDAX decoder
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for NDAX decoding operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// The ZIP container could not be read
    #[error("Archive error in '{path}': {message}")]
    Archive {
        path: String,
        message: String,
        #[source]
        source: Option<zip::result::ZipError>,
    },

    /// A required binary member is absent from the archive
    #[error("Required archive member not found: {member}")]
    MissingMember { member: String },

    /// A split-stream file declares a layout version this decoder does not read
    #[error("Unsupported {stream} version {version} (minimum supported is {minimum})")]
    UnsupportedVersion {
        stream: String,
        version: u8,
        minimum: u8,
    },

    /// Step-state code outside the instrument table
    #[error("Unknown step status code: {code}")]
    UnknownStatusCode { code: i32 },

    /// Current-range code outside the instrument table
    #[error("Unknown current range: {range}")]
    UnknownCurrentRange { range: i32 },

    /// A record decoded to an impossible value
    #[error("Record decode error at byte {offset}: {message}")]
    RecordDecode { offset: usize, message: String },

    /// XML metadata could not be parsed
    #[error("XML error in '{member}': {message}")]
    Xml { member: String, message: String },

    /// DataFrame construction or export failed
    #[error("Frame error: {message}")]
    Frame {
        message: String,
        #[source]
        source: polars::error::PolarsError,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Directory traversal error
    #[error("Directory traversal error: {message}")]
    DirectoryTraversal {
        message: String,
        #[source]
        source: walkdir::Error,
    },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create an archive error, optionally carrying the underlying ZIP error
    pub fn archive(
        path: impl Into<String>,
        message: impl Into<String>,
        source: Option<zip::result::ZipError>,
    ) -> Self {
        Self::Archive {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a missing member error
    pub fn missing_member(member: impl Into<String>) -> Self {
        Self::MissingMember {
            member: member.into(),
        }
    }

    /// Create an unsupported version error
    pub fn unsupported_version(stream: impl Into<String>, version: u8, minimum: u8) -> Self {
        Self::UnsupportedVersion {
            stream: stream.into(),
            version,
            minimum,
        }
    }

    /// Create an unknown status code error
    pub fn unknown_status_code(code: i32) -> Self {
        Self::UnknownStatusCode { code }
    }

    /// Create an unknown current range error
    pub fn unknown_current_range(range: i32) -> Self {
        Self::UnknownCurrentRange { range }
    }

    /// Create a record decode error
    pub fn record_decode(offset: usize, message: impl Into<String>) -> Self {
        Self::RecordDecode {
            offset,
            message: message.into(),
        }
    }

    /// Create an XML error
    pub fn xml(member: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Xml {
            member: member.into(),
            message: message.into(),
        }
    }

    /// Create a frame error with context
    pub fn frame(message: impl Into<String>, source: polars::error::PolarsError) -> Self {
        Self::Frame {
            message: message.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True for errors that describe the input data rather than the environment
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedVersion { .. }
                | Self::UnknownStatusCode { .. }
                | Self::UnknownCurrentRange { .. }
                | Self::RecordDecode { .. }
                | Self::MissingMember { .. }
        )
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(error: zip::result::ZipError) -> Self {
        Self::Archive {
            path: "unknown".to_string(),
            message: "ZIP container could not be read".to_string(),
            source: Some(error),
        }
    }
}

impl From<polars::error::PolarsError> for Error {
    fn from(error: polars::error::PolarsError) -> Self {
        Self::Frame {
            message: "DataFrame operation failed".to_string(),
            source: error,
        }
    }
}

impl From<walkdir::Error> for Error {
    fn from(error: walkdir::Error) -> Self {
        Self::DirectoryTraversal {
            message: "Directory traversal failed".to_string(),
            source: error,
        }
    }
}
