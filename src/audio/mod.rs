// Audio module - tracks, decoded waveforms and the decoder boundary
//
// The analysis pipeline only depends on the narrow `Decoder` contract:
// a file path goes in, a mono waveform (samples + sample rate) comes out.

pub mod decoder;

use std::path::{Path, PathBuf};

pub use decoder::{decode_with_budget, Decoder, FileDecoder};

/// A track on disk, identified by its path and file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTrack {
    path: PathBuf,
    name: String,
}

impl AudioTrack {
    /// Create a track from a path; the name is the final path component
    pub fn from_path<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used as the key in the tag mapping
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Decoded mono audio
///
/// Produced once per extraction call and dropped afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Keep at most the first `seconds` of audio
    pub fn truncate_to(&mut self, seconds: f32) {
        let max_samples = max_samples_for(seconds, self.sample_rate);
        self.samples.truncate(max_samples);
    }
}

/// Number of mono samples covering `seconds` at `sample_rate`
pub(crate) fn max_samples_for(seconds: f32, sample_rate: u32) -> usize {
    if seconds <= 0.0 || !seconds.is_finite() {
        return usize::MAX;
    }
    (seconds as f64 * sample_rate as f64).round() as usize
}
