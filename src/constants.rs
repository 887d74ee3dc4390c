//! Application constants for the NDAX decoder
//!
//! This module contains the binary layout offsets, archive member names,
//! metadata sentinels, default thresholds and column names used throughout
//! the decoder.

// =============================================================================
// Archive Members
// =============================================================================

/// Archive member names written by the instrument software
pub mod members {
    /// Primary telemetry stream (both format variants)
    pub const DATA: &str = "data.ndc";

    /// Run-info stream (split-stream format only)
    pub const RUN_INFO: &str = "data_runInfo.ndc";

    /// Step-identity stream (split-stream format only)
    pub const STEP: &str = "data_step.ndc";

    /// Test information XML
    pub const TEST_INFO: &str = "TestInfo.xml";

    /// Step program XML
    pub const STEP_XML: &str = "Step.xml";

    /// Extension of members scanned for fallback metadata
    pub const XML_EXTENSION: &str = "xml";
}

// =============================================================================
// Single-Stream Layout
// =============================================================================

/// Byte offsets and markers of the single-stream `data.ndc` layout
pub mod single_stream {
    /// Header window probed to tell the two record layouts apart
    pub const LAYOUT_PROBE: std::ops::Range<usize> = 517..525;

    /// Sync sequence location for the 90-byte layout
    pub const SHORT_SYNC: std::ops::Range<usize> = 4225..4229;

    /// Record length when the probe window is populated
    pub const LONG_RECORD_LEN: usize = 94;

    /// Record length when the probe window is zero
    pub const SHORT_RECORD_LEN: usize = 90;

    /// Distance from the sync hit back to the record start (90-byte layout)
    pub const SHORT_SYNC_OFFSET: usize = 4;

    /// Marker byte positions within a 90-byte record
    pub const SHORT_AUX_MARKER_AT: usize = 3;
    pub const SHORT_PRIMARY_MARKER_AT: usize = 7;

    /// Marker values
    pub const PRIMARY_MARKER: u8 = 0x55;
    pub const AUX_MARKER_VT: u8 = 0x65;
    pub const AUX_MARKER_VTT: u8 = 0x74;

    /// Status byte values that mark an unused record slot
    pub const EMPTY_STATUS: u8 = 0;
    pub const FILLER_STATUS: u8 = 255;

    /// Field offsets within a primary record
    pub const INDEX_AT: usize = 8;
    pub const CYCLE_AT: usize = 12;
    pub const STEP_AT: usize = 16;
    pub const STATUS_AT: usize = 17;
    pub const ELAPSED_MS_AT: usize = 23;
    pub const VOLTAGE_AT: usize = 31;
    pub const CURRENT_AT: usize = 35;
    pub const CHARGE_CAPACITY_AT: usize = 43;
    pub const DISCHARGE_CAPACITY_AT: usize = 51;
    pub const CHARGE_ENERGY_AT: usize = 59;
    pub const DISCHARGE_ENERGY_AT: usize = 67;
    pub const DATE_AT: usize = 75;
    pub const RANGE_AT: usize = 82;

    /// Field offsets within an auxiliary record
    pub const AUX_CHANNEL_AT: usize = 3;
    pub const AUX_TEMPERATURE_AT: usize = 41;
    pub const AUX_SECOND_TEMPERATURE_AT: usize = 43;
}

// =============================================================================
// Split-Stream Layout
// =============================================================================

/// Block framing shared by the three split-stream files
pub mod split_stream {
    /// File header length preceding the first block
    pub const HEADER_LEN: usize = 4096;

    /// Block length
    pub const BLOCK_LEN: usize = 4096;

    /// Start of the record payload within a block
    pub const PAYLOAD_START: usize = 132;

    /// Trailer excluded from the end of each `data.ndc` block
    pub const DATA_TRAILER: usize = 4;

    /// File offset of the layout version byte
    pub const VERSION_AT: usize = 2;

    /// Oldest run-info/step layout this decoder reads
    pub const MIN_SUPPORTED_VERSION: u8 = 11;

    /// Run-info layout switch: this version and later use the long record
    pub const RUN_INFO_LONG_FROM: u8 = 14;

    pub const RUN_INFO_LONG_RECORD: usize = 55;
    pub const RUN_INFO_LONG_TRAILER: usize = 59;
    pub const RUN_INFO_SHORT_RECORD: usize = 47;
    pub const RUN_INFO_SHORT_TRAILER: usize = 63;

    pub const STEP_RECORD: usize = 37;
    pub const STEP_TRAILER: usize = 5;

    /// Counter units in run-info records (milli-unit seconds per unit hour)
    pub const COUNTER_DIVISOR: f64 = 3_600_000.0;
}

/// Scale of raw voltage integers (and split-stream voltage floats)
pub const VOLTAGE_DIVISOR: f64 = 10_000.0;

/// Scale of split-stream current floats (milliamperes)
pub const SPLIT_CURRENT_DIVISOR: f64 = 1_000.0;

/// Seconds per hour
pub const SECONDS_PER_HOUR: f64 = 3_600.0;

/// Scale of raw temperature integers
pub const TEMPERATURE_DIVISOR: f64 = 10.0;

// =============================================================================
// Record Sanity Thresholds
// =============================================================================

/// Rows below this voltage are rejected during single-stream decoding
pub const MIN_DECODE_VOLTAGE_V: f64 = 1.5;

/// Default timezone offsets applied to split-stream timestamps (seconds east of UTC)
pub const DEFAULT_SOURCE_OFFSET_S: i32 = 6 * 3600;
pub const DEFAULT_TARGET_OFFSET_S: i32 = 5 * 3600 + 1800;

// =============================================================================
// Validation Defaults
// =============================================================================

pub mod validation {
    /// Allowed disagreement between elapsed-time and timestamp deltas (seconds)
    pub const TIMEGAP_TOLERANCE_S: f64 = 5.0;

    /// Minimum plausible cell voltage outside simulation steps
    pub const MIN_VOLTAGE_V: f64 = 2.0;

    /// Capacity ceiling as a multiple of the nominal capacity
    pub const CAPACITY_CEILING_FACTOR: f64 = 1500.0;

    /// Current ceiling as a multiple of the nominal capacity
    pub const CURRENT_CEILING_FACTOR: f64 = 1600.0;

    /// Required barcode length
    pub const BARCODE_LEN: usize = 12;

    /// Characters never allowed in metadata strings
    pub const CONTROL_CHAR_PATTERN: &str = r"[\x00-\x08\x0B\x0C\x0E-\x1F]";
}

// =============================================================================
// Aggregation and Recipe Defaults
// =============================================================================

pub const DEFAULT_CHARGE_LABEL: &str = "CCCV_Chg";
pub const DEFAULT_DISCHARGE_LABEL: &str = "CC_Dchg";

/// Fallback label patterns (case-insensitive)
pub const CHARGE_LABEL_PATTERN: &str = r"(?i)chg";
pub const DISCHARGE_LABEL_PATTERN: &str = r"(?i)dchg";

pub const DEFAULT_RECIPE_TOLERANCE: f64 = 0.05;
pub const DEFAULT_RECIPE_PREFIX: &str = "Recipe";

/// Factor applied to |ΔV/ΔI| when deriving DCIR(mOhm)
pub const DCIR_SCALE: f64 = 1.0e6;

// =============================================================================
// Column Names
// =============================================================================

pub mod columns {
    /// Record columns in frame order; the last two are optional
    pub const CANONICAL: [&str; 13] = [
        "Index",
        "Cycle",
        "Step",
        "Status",
        "Time",
        "Voltage",
        "Current(A)",
        "Capacity(Ah)",
        "Energy(Wh)",
        "Timestamp",
        "Validated",
        "DCIR(mOhm)",
        "T",
    ];

    /// Names used by the vendor's desktop client export
    pub const BTS_CLIENT: [&str; 13] = [
        "DataPoint",
        "Cycle Index",
        "Step Index",
        "Step Type",
        "Time",
        "Voltage(V)",
        "Current(A)",
        "Capacity(Ah)",
        "Energy(Wh)",
        "Timestamp",
        "Validated",
        "DCIR(mOhm)",
        "T",
    ];

    /// Names used by the vendor's spreadsheet export
    pub const SPREADSHEET: [&str; 13] = [
        "DataPoint",
        "Cycle Index",
        "Step Index",
        "Status",
        "Time",
        "Voltage(V)",
        "Current(A)",
        "Capacity(Ah)",
        "Energy(Wh)",
        "Date",
        "Validated",
        "DCIR(mOhm)",
        "Temperature",
    ];

    /// Columns always present in a record frame
    pub const REQUIRED: usize = 11;

    /// Raw per-cycle step id, when kept
    pub const STEP_ID: &str = "Step ID";

    pub const STEP_SUMMARY: [&str; 15] = [
        "Cycle Index",
        "Step Number",
        "Step Type",
        "Step Time",
        "Onset Date",
        "End Date",
        "Capacity(Ah)",
        "Energy(Wh)",
        "Onset Volt.(V)",
        "End Voltage(V)",
        "Starting current(A)",
        "Termination current(A)",
        "Max Volt.(V)",
        "Min Volt(V)",
        "DCIR(mOhm)",
    ];

    pub const CYCLE_SUMMARY: [&str; 19] = [
        "Cycle Index",
        "Onset Date",
        "End Date",
        "Chg. Cap.(Ah)",
        "DChg. Cap.(Ah)",
        "Chg. Energy(Wh)",
        "DChg. Energy(Wh)",
        "Chg. Time",
        "DChg. Time",
        "Chg. Onset Volt.(V)",
        "DChg. Onset Volt.(V)",
        "Chg. End Volt.(V)",
        "DChg. End Volt.(V)",
        "Chg. Onset Current(A)",
        "DChg. Onset Current(A)",
        "Chg. End Current(A)",
        "DChg. End Current(A)",
        "DCIR(mOhm)",
        "Coulombic Efficiency",
    ];

    pub const RECIPE: [&str; 9] = [
        "Recipe",
        "Cycles",
        "Step",
        "Status",
        "Voltage(V)",
        "Current(A)",
        "Rest Time",
        "Cutoff Current(A)",
        "Cutoff Voltage(V)",
    ];
}

// =============================================================================
// Metadata Sentinels
// =============================================================================

pub mod sentinels {
    pub const BARCODE: &str = "Barcode element not found.";
    pub const PROCESS_NAME: &str = "StepName element not found.";
    pub const REMARK: &str = "Remark element not found.";
    pub const START_TIME: &str = "StartTime element not found.";
}

// =============================================================================
// Working Area Cleanup
// =============================================================================

/// Pause before the single cleanup retry (milliseconds)
pub const CLEANUP_RETRY_PAUSE_MS: u64 = 50;
