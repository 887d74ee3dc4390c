//! Validation driver

use super::checks::{
    check_metadata, check_physics, check_structure, flag_rest_current, flag_timegaps,
};
use super::report::{ValidationFailure, ValidationOutcome, ValidationReport};
use crate::app::models::{Record, TestMetadata};
use crate::config::{ValidationConfig, ValidationProfile};
use tracing::{debug, info, warn};

/// Applies the continuity pre-pass and the configured profile
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a decoded series
    ///
    /// The series is judged as a whole. Row flags set by the pre-pass are
    /// kept whatever the verdict, and the first failing check decides it.
    ///
    /// # Arguments
    ///
    /// * `records` - Decoded series in index order
    /// * `metadata` - Test metadata, consulted by the full profile only
    ///
    /// # Returns
    ///
    /// The series with updated `validated` flags and the verdict
    pub fn validate(
        &self,
        mut records: Vec<Record>,
        metadata: Option<&TestMetadata>,
    ) -> ValidationOutcome {
        let mut report = ValidationReport {
            timegap_rows: flag_timegaps(&mut records, self.config.timegap_tolerance_s),
            rest_current_rows: flag_rest_current(&mut records),
            ..Default::default()
        };

        if report.flagged_rows() > 0 {
            warn!(
                "Continuity pre-pass cleared {} rows ({} timegap, {} rest-current)",
                report.flagged_rows(),
                report.timegap_rows,
                report.rest_current_rows
            );
        }

        let verdict = self.judge(&records, metadata, &report);
        match verdict {
            Ok(()) => {
                report.passed = true;
                debug!("{}", report.summary());
            }
            Err(failure) => {
                info!("Validation failed: {}", failure);
                report.failure = Some(failure);
            }
        }

        ValidationOutcome { records, report }
    }

    fn judge(
        &self,
        records: &[Record],
        metadata: Option<&TestMetadata>,
        report: &ValidationReport,
    ) -> std::result::Result<(), ValidationFailure> {
        if self.config.fail_on_timegap && report.flagged_rows() > 0 {
            return Err(ValidationFailure::FlaggedRows {
                count: report.flagged_rows(),
            });
        }

        check_structure(records)?;

        if let ValidationProfile::Full {
            nominal_capacity_ah,
        } = self.config.profile
        {
            check_physics(records, &self.config, nominal_capacity_ah)?;
            if let Some(metadata) = metadata.filter(|m| m.is_checkable()) {
                check_metadata(metadata, self.config.barcode_len)?;
            }
        }
        Ok(())
    }
}
