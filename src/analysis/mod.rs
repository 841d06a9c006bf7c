// Analysis module - DSP pipeline from waveform to mood label
//
// Pipeline: Spectrogram → OnsetDetector → TempoKeyEstimator (+ BeatTracker)
//           → FeatureExtractor → MoodClassifier
//
// Every stage is a pure function of its input and the run's configuration;
// nothing here holds state between tracks.

pub mod beat;
pub mod classifier;
pub mod features;
pub mod onset;
pub mod tempo;

pub use classifier::{classify, MoodClassifier, MoodLabel, ParseMoodError};
pub use features::{FeatureExtractor, FeatureVector, TrackFeatures, FEATURE_COUNT};
pub use tempo::{KeyMode, TempoKey, TempoKeyEstimator};
