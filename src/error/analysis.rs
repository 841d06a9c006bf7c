// Analysis error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Analysis error code constants
///
/// Error code range: 3001-3005
pub struct AnalysisErrorCodes {}

impl AnalysisErrorCodes {
    /// Waveform too short (or too empty) to beat-track or key-estimate
    pub const INSUFFICIENT_SIGNAL: i32 = 3001;

    /// File could not be read or decoded
    pub const DECODE_FAILURE: i32 = 3002;

    /// Feature extraction failed for a track
    pub const EXTRACTION_FAILURE: i32 = 3003;

    /// Extraction produced a non-finite feature value
    pub const NON_FINITE_FEATURE: i32 = 3004;

    /// Another track in the same batch already uses this file name
    pub const DUPLICATE_TRACK: i32 = 3005;
}

/// Log an analysis error with structured context
///
/// Logs the error code, failure kind and message together with the
/// caller-supplied context (usually the track name).
pub fn log_analysis_error(err: &AnalysisError, context: &str) {
    error!(
        "Analysis error in {}: code={}, kind={}, message={}",
        context,
        err.code(),
        err.kind(),
        err.message()
    );
}

/// Errors raised while decoding a track or deriving its features
///
/// `ExtractionFailure` is what the feature extractor surfaces; it wraps the
/// underlying decode or signal error so callers can still inspect the cause.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Waveform has fewer samples than one analysis frame
    InsufficientSignal { samples: usize, required: usize },

    /// Unreadable, corrupt or unsupported file, or decode budget exceeded
    DecodeFailure { path: String, reason: String },

    /// Feature extraction failed for `track`
    ExtractionFailure {
        track: String,
        cause: Box<AnalysisError>,
    },

    /// A feature slot came out as NaN or infinity
    NonFiniteFeature { slot: usize },

    /// A track whose file name was already tagged earlier in the batch
    DuplicateTrack { track: String, path: String },
}

impl AnalysisError {
    /// Wrap `cause` as an extraction failure for `track`
    ///
    /// Already-wrapped errors are returned unchanged so the wrapping never nests.
    pub fn extraction(track: impl Into<String>, cause: AnalysisError) -> Self {
        match cause {
            AnalysisError::ExtractionFailure { .. } => cause,
            other => AnalysisError::ExtractionFailure {
                track: track.into(),
                cause: Box::new(other),
            },
        }
    }

    /// Stable failure kind, used in batch failure logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::InsufficientSignal { .. } => "insufficient_signal",
            AnalysisError::DecodeFailure { .. } => "decode_failure",
            AnalysisError::ExtractionFailure { cause, .. } => cause.kind(),
            AnalysisError::NonFiniteFeature { .. } => "non_finite_feature",
            AnalysisError::DuplicateTrack { .. } => "duplicate_track",
        }
    }

    /// Innermost error, skipping extraction wrappers
    pub fn root_cause(&self) -> &AnalysisError {
        match self {
            AnalysisError::ExtractionFailure { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

impl ErrorCode for AnalysisError {
    fn code(&self) -> i32 {
        match self {
            AnalysisError::InsufficientSignal { .. } => AnalysisErrorCodes::INSUFFICIENT_SIGNAL,
            AnalysisError::DecodeFailure { .. } => AnalysisErrorCodes::DECODE_FAILURE,
            AnalysisError::ExtractionFailure { .. } => AnalysisErrorCodes::EXTRACTION_FAILURE,
            AnalysisError::NonFiniteFeature { .. } => AnalysisErrorCodes::NON_FINITE_FEATURE,
            AnalysisError::DuplicateTrack { .. } => AnalysisErrorCodes::DUPLICATE_TRACK,
        }
    }

    fn message(&self) -> String {
        match self {
            AnalysisError::InsufficientSignal { samples, required } => {
                format!(
                    "Insufficient signal: {} samples, at least {} required",
                    samples, required
                )
            }
            AnalysisError::DecodeFailure { path, reason } => {
                format!("Failed to decode {}: {}", path, reason)
            }
            AnalysisError::ExtractionFailure { track, cause } => {
                format!("Feature extraction failed for {}: {}", track, cause.message())
            }
            AnalysisError::NonFiniteFeature { slot } => {
                format!("Feature slot {} is not a finite number", slot)
            }
            AnalysisError::DuplicateTrack { track, path } => {
                format!("{} ({}) has the same name as an earlier track", track, path)
            }
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message(), self.code())
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::ExtractionFailure { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}
