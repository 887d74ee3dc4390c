//! Decode statistics

/// Counters collected while decoding one archive
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeStats {
    /// Candidate records found by the sync scan (single-stream) or rows read (split-stream)
    pub records_scanned: usize,
    /// Primary records that made it into the sequence
    pub records_decoded: usize,
    /// Primary records with an empty/filler status byte
    pub invalid_status: usize,
    /// Rows rejected by the index/cycle/step/voltage pre-check
    pub precheck_rejected: usize,
    /// Records whose marker byte matched nothing known
    pub unknown_markers: usize,
    /// Rows dropped because their index was already seen
    pub duplicates: usize,
    /// Auxiliary records decoded
    pub aux_decoded: usize,
    /// Rows whose missing fields were reconstructed
    pub fabricated_rows: usize,
    /// Rows dropped because they could not be reconstructed
    pub dropped_incomplete: usize,
}

impl DecodeStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows that were read but did not make it into the sequence
    pub fn total_skipped(&self) -> usize {
        self.invalid_status
            + self.precheck_rejected
            + self.unknown_markers
            + self.duplicates
            + self.dropped_incomplete
    }

    /// Share of scanned records that were decoded, as a percentage
    pub fn decode_rate(&self) -> f64 {
        if self.records_scanned == 0 {
            100.0
        } else {
            (self.records_decoded as f64 / self.records_scanned as f64) * 100.0
        }
    }

    /// Summary line for logging
    pub fn summary(&self) -> String {
        format!(
            "Decode Summary: {} scanned -> {} records ({:.1}%) | \
             Invalid status: {} | Pre-check rejected: {} | Unknown markers: {} | \
             Duplicates: {} | Aux: {} | Fabricated: {} | Dropped: {}",
            self.records_scanned,
            self.records_decoded,
            self.decode_rate(),
            self.invalid_status,
            self.precheck_rejected,
            self.unknown_markers,
            self.duplicates,
            self.aux_decoded,
            self.fabricated_rows,
            self.dropped_incomplete
        )
    }
}
