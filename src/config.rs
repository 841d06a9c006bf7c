//! Configuration management for analysis, training and batch parameters
//!
//! Runtime configuration is loaded from JSON files so windowing, forest
//! size and batch behaviour can be adjusted without recompilation. All
//! analysis parameters must stay constant across a run, otherwise feature
//! vectors from different tracks are not comparable.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

/// Feature extraction and tempo/key estimation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Only the first N seconds of each track are decoded and analysed
    pub max_duration_secs: f32,
    /// STFT frame size in samples (also the minimum analysable length)
    pub frame_size: usize,
    /// Hop size between frames in samples
    pub hop_size: usize,
    /// Number of mel bands feeding the MFCC DCT
    pub n_mels: usize,
    /// Fraction of spectral energy below the roll-off frequency
    pub rolloff_percent: f32,
    /// Lowest tempo considered by the tempo estimator
    pub min_bpm: f32,
    /// Highest tempo considered by the tempo estimator
    pub max_bpm: f32,
    /// Centre of the tempo prior, reported when no periodicity is found
    pub start_bpm: f32,
    /// Beat tracker tightness (higher = stricter adherence to the period)
    pub beat_tightness: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: 30.0,
            frame_size: 2048,
            hop_size: 512,
            n_mels: 40,
            rolloff_percent: 0.85,
            min_bpm: 30.0,
            max_bpm: 300.0,
            start_bpm: 120.0,
            beat_tightness: 100.0,
        }
    }
}

/// Decision-tree ensemble parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// RNG seed for bootstrap and feature sampling
    pub seed: u64,
    /// Maximum tree depth (None = grow until pure)
    pub max_depth: Option<usize>,
    /// Minimum samples in a node before it may be split
    pub min_samples_split: usize,
    /// Resample the training set with replacement per tree
    pub bootstrap: bool,
    /// Fall back to the built-in bootstrap set when no samples are given
    pub use_builtin_samples: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
            max_depth: None,
            min_samples_split: 2,
            bootstrap: true,
            use_builtin_samples: true,
        }
    }
}

/// Batch processing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// File extensions treated as tracks (lowercase, no dot)
    pub extensions: Vec<String>,
    /// Worker threads (1 = strictly sequential)
    pub workers: usize,
    /// Wall-clock budget for decoding one track
    pub decode_timeout_secs: u64,
    /// File name of the tag mapping inside the processed folder
    pub tag_file_name: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            extensions: ["mp3", "wav", "flac", "ogg", "m4a"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            workers: 1,
            decode_timeout_secs: 60,
            tag_file_name: "mood_tags.json".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults (with a warning) when the
    /// file is missing or its JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}
