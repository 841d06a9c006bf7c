// Training error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Training error code constants
///
/// Error code range: 4001-4002
pub struct TrainingErrorCodes {}

impl TrainingErrorCodes {
    /// Trainer cannot produce a model with the given samples/settings
    pub const CONFIGURATION_ERROR: i32 = 4001;

    /// A training sample is unusable
    pub const INVALID_SAMPLE: i32 = 4002;
}

/// Log a training error with structured context
pub fn log_training_error(err: &TrainingError, context: &str) {
    error!(
        "Training error in {}: code={}, component=ClassifierTrainer, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Training-related errors
///
/// Any of these aborts a batch run, since no track can be classified
/// without a model.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingError {
    /// Empty sample set with no fallback, or unusable trainer settings
    ConfigurationError { reason: String },

    /// Sample at `index` cannot be used for training
    InvalidSample { index: usize, reason: String },
}

impl TrainingError {
    /// Stable failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            TrainingError::ConfigurationError { .. } => "configuration_error",
            TrainingError::InvalidSample { .. } => "invalid_sample",
        }
    }
}

impl ErrorCode for TrainingError {
    fn code(&self) -> i32 {
        match self {
            TrainingError::ConfigurationError { .. } => TrainingErrorCodes::CONFIGURATION_ERROR,
            TrainingError::InvalidSample { .. } => TrainingErrorCodes::INVALID_SAMPLE,
        }
    }

    fn message(&self) -> String {
        match self {
            TrainingError::ConfigurationError { reason } => {
                format!("Classifier configuration error: {}", reason)
            }
            TrainingError::InvalidSample { index, reason } => {
                format!("Training sample {} is invalid: {}", index, reason)
            }
        }
    }
}

impl fmt::Display for TrainingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message(), self.code())
    }
}

impl std::error::Error for TrainingError {}
