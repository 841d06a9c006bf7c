// Error types for the mood tagger
//
// This module defines custom error types for analysis and training operations,
// providing structured error handling with stable error codes and failure
// kinds suitable for batch failure reports.

mod analysis;
mod training;

pub use analysis::{log_analysis_error, AnalysisError, AnalysisErrorCodes};
pub use training::{log_training_error, TrainingError, TrainingErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the library and the command-line front end.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
