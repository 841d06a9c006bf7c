// Classifier - mood inference over feature vectors
//
// This module owns the closed mood vocabulary and the inference step:
// a feature vector (or its absence, when extraction failed upstream) goes in,
// a MoodLabel comes out. The trained model is passed in explicitly and is
// only ever read, so one model can serve any number of threads.
//
// Vocabulary: sad, happy, vibe, motivation, plus `unknown` for tracks that
// could not be analysed. `unknown` is never a training label.

use crate::analysis::features::FeatureVector;
use crate::training::TrainedModel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Coarse mood label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodLabel {
    /// Slow, minor-key material
    Sad,
    /// Fast, major-key material
    Happy,
    /// Mid-tempo, laid-back material
    Vibe,
    /// Fast, driving material
    Motivation,
    /// No features available
    Unknown,
}

impl MoodLabel {
    /// Every label, in declaration order
    pub const ALL: [MoodLabel; 5] = [
        MoodLabel::Sad,
        MoodLabel::Happy,
        MoodLabel::Vibe,
        MoodLabel::Motivation,
        MoodLabel::Unknown,
    ];

    /// Labels a model can be trained to predict
    pub const TRAINABLE: [MoodLabel; 4] = [
        MoodLabel::Sad,
        MoodLabel::Happy,
        MoodLabel::Vibe,
        MoodLabel::Motivation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoodLabel::Sad => "sad",
            MoodLabel::Happy => "happy",
            MoodLabel::Vibe => "vibe",
            MoodLabel::Motivation => "motivation",
            MoodLabel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no mood
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMoodError {
    input: String,
}

impl fmt::Display for ParseMoodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown mood '{}' (expected one of sad, happy, vibe, motivation, unknown)",
            self.input
        )
    }
}

impl std::error::Error for ParseMoodError {}

impl FromStr for MoodLabel {
    type Err = ParseMoodError;

    /// Case-insensitive, surrounding whitespace ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        MoodLabel::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == normalized)
            .ok_or_else(|| ParseMoodError {
                input: s.to_string(),
            })
    }
}

/// Classify `features` with `model`
///
/// Absent features yield `Unknown` without consulting the model.
pub fn classify(model: &TrainedModel, features: Option<&FeatureVector>) -> MoodLabel {
    match features {
        Some(features) => model.predict(features),
        None => MoodLabel::Unknown,
    }
}

/// MoodClassifier holds a shared read-only model for repeated inference
///
/// Cloning is cheap; every clone shares the same model.
#[derive(Debug, Clone)]
pub struct MoodClassifier {
    model: Arc<TrainedModel>,
}

impl MoodClassifier {
    pub fn new(model: Arc<TrainedModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// See [`classify`]
    pub fn classify(&self, features: Option<&FeatureVector>) -> MoodLabel {
        classify(&self.model, features)
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
