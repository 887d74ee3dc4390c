//! Series validation
//!
//! A continuity pre-pass clears the `validated` flag on rows whose timing is
//! suspect, then a profile of invariants produces a single verdict for the
//! whole series. A failed verdict never discards data.
//!
//! # Architecture
//!
//! - [`validator`] - Driver applying the pre-pass and profile
//! - [`checks`] - Pre-pass flaggers and invariant checks
//! - [`report`] - Verdict, failure reasons and counts
//!
//! # Profiles
//!
//! - **Basic**: index, cycle and step structure
//! - **Full**: adds voltage floor, counter signs, nominal-capacity ceilings
//!   and metadata checks

pub mod checks;
pub mod report;
#[allow(clippy::module_inception)]
pub mod validator;

pub use report::{ValidationFailure, ValidationOutcome, ValidationReport};
pub use validator::Validator;

#[cfg(test)]
pub mod tests;
