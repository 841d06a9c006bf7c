// Mood Tagger Core - audio feature extraction and mood classification
// Decodes tracks, fingerprints them into 21-slot feature vectors, classifies
// them with a seeded random forest and tags whole folders without letting a
// single bad file stop the run.

// Module declarations
pub mod analysis;
pub mod audio;
pub mod batch;
pub mod config;
pub mod error;
pub mod tags;
pub mod training;

// Re-exports for convenience
pub use analysis::{
    classify, FeatureExtractor, FeatureVector, KeyMode, MoodClassifier, MoodLabel, TempoKey,
    TempoKeyEstimator, FEATURE_COUNT,
};
pub use audio::{AudioTrack, Decoder, FileDecoder, Waveform};
pub use batch::{BatchOutcome, BatchProcessor, TrackCatalog, TrackFailure};
pub use config::AppConfig;
pub use error::{AnalysisError, ErrorCode, TrainingError};
pub use tags::{load_tags, save_tags, MoodTagMapping};
pub use training::{load_model, save_model, ClassifierTrainer, LabeledSample, TrainedModel};
