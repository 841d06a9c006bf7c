// Types module - Data structures for audio features
//
// A track's fingerprint is a statically sized 21-slot vector. The slot order
// is fixed for the lifetime of a model: the classifier, the normalizer and
// saved models all index into it positionally.

use serde::{Deserialize, Serialize};

/// Number of slots in every feature vector
pub const FEATURE_COUNT: usize = 21;

/// Number of mean MFCC coefficients (slots 8..=20)
pub const MFCC_COUNT: usize = 13;

/// Slot indices in a `FeatureVector`
pub mod slot {
    pub const BPM: usize = 0;
    pub const KEY_IS_MAJOR: usize = 1;
    pub const RMS: usize = 2;
    pub const SPECTRAL_CENTROID: usize = 3;
    pub const SPECTRAL_ROLLOFF: usize = 4;
    pub const ZERO_CROSSING_RATE: usize = 5;
    pub const VALENCE: usize = 6;
    pub const TEMPO_STABILITY: usize = 7;
    pub const MFCC_START: usize = 8;
}

/// Human-readable slot names, in slot order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "bpm",
    "key_is_major",
    "rms",
    "spectral_centroid",
    "spectral_rolloff",
    "zero_crossing_rate",
    "valence",
    "tempo_stability",
    "mfcc_0",
    "mfcc_1",
    "mfcc_2",
    "mfcc_3",
    "mfcc_4",
    "mfcc_5",
    "mfcc_6",
    "mfcc_7",
    "mfcc_8",
    "mfcc_9",
    "mfcc_10",
    "mfcc_11",
    "mfcc_12",
];

/// Fixed-length numeric fingerprint of one track
///
/// Serialized as a plain JSON array of 21 numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    /// Build from a slice, `None` unless it has exactly 21 values
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        let array: [f64; FEATURE_COUNT] = values.try_into().ok()?;
        Some(Self(array))
    }

    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn get(&self, slot: usize) -> f64 {
        self.0[slot]
    }

    pub fn bpm(&self) -> f64 {
        self.0[slot::BPM]
    }

    pub fn key_is_major(&self) -> bool {
        self.0[slot::KEY_IS_MAJOR] >= 0.5
    }

    pub fn rms(&self) -> f64 {
        self.0[slot::RMS]
    }

    pub fn zero_crossing_rate(&self) -> f64 {
        self.0[slot::ZERO_CROSSING_RATE]
    }

    pub fn mfcc(&self) -> &[f64] {
        &self.0[slot::MFCC_START..]
    }

    /// First slot holding NaN or infinity, if any
    pub fn first_non_finite(&self) -> Option<usize> {
        self.0.iter().position(|value| !value.is_finite())
    }
}

/// Named per-track measurements before they are flattened into slots
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFeatures {
    pub bpm: f64,
    pub key_is_major: bool,
    pub rms: f64,
    pub spectral_centroid: f64,
    pub spectral_rolloff: f64,
    pub zero_crossing_rate: f64,
    pub valence: f64,
    pub tempo_stability: f64,
    pub mfcc: [f64; MFCC_COUNT],
}

impl TrackFeatures {
    /// Flatten into the fixed slot order
    pub fn to_vector(&self) -> FeatureVector {
        let mut values = [0.0; FEATURE_COUNT];
        values[slot::BPM] = self.bpm;
        values[slot::KEY_IS_MAJOR] = if self.key_is_major { 1.0 } else { 0.0 };
        values[slot::RMS] = self.rms;
        values[slot::SPECTRAL_CENTROID] = self.spectral_centroid;
        values[slot::SPECTRAL_ROLLOFF] = self.spectral_rolloff;
        values[slot::ZERO_CROSSING_RATE] = self.zero_crossing_rate;
        values[slot::VALENCE] = self.valence;
        values[slot::TEMPO_STABILITY] = self.tempo_stability;
        values[slot::MFCC_START..].copy_from_slice(&self.mfcc);
        FeatureVector(values)
    }
}
