//! Crate-level error type for controller construction and refresh

use thiserror::Error;

use crate::view::ViewError;

/// Errors raised while discovering steps or binding triggers.
///
/// The transition path itself never fails: out-of-range requests are absorbed
/// and reported through [`crate::TransitionOutcome`] instead.
#[derive(Error, Debug)]
pub enum StepperError {
    #[error("view lookup failed: {0}")]
    View(#[from] ViewError),

    #[error("invalid option '{option}': {reason}")]
    InvalidOption { option: &'static str, reason: String },
}

impl StepperError {
    pub fn invalid_option(option: &'static str, reason: impl Into<String>) -> Self {
        StepperError::InvalidOption {
            option,
            reason: reason.into(),
        }
    }
}
