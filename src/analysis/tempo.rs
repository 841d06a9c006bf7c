// TempoKeyEstimator - global tempo, beat positions and major/minor key
//
// Tempo:
// 1. Onset strength envelope (spectral flux) from the track's spectrogram
// 2. Autocorrelation of the envelope over lags covering [min_bpm, max_bpm]
// 3. Each lag weighted by a log-normal prior centred on start_bpm
//    (one octave standard deviation)
// 4. Best weighted lag wins; the shortest lag is kept on ties
//
// Beats come from the dynamic-programming tracker at the winning period.
//
// Key: the dominant pitch class of the time-averaged chroma profile decides
// the mode. C, F and G count as major, every other class as minor. This is a
// coarse heuristic, not a key detector.

use crate::analysis::beat::BeatTracker;
use crate::analysis::features::{
    dominant_pitch_class, ChromaExtractor, FftProcessor, Spectrogram, PITCH_CLASSES,
};
use crate::analysis::onset::OnsetDetector;
use crate::audio::Waveform;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};

/// Pitch classes read as a major key (C, F, G)
pub const MAJOR_PITCH_CLASSES: [usize; 3] = [0, 5, 7];

/// Major/minor key mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    Major,
    Minor,
}

impl KeyMode {
    /// Mode for the dominant pitch class of a chroma profile
    pub fn from_pitch_class(pitch_class: usize) -> Self {
        if MAJOR_PITCH_CLASSES.contains(&pitch_class) {
            KeyMode::Major
        } else {
            KeyMode::Minor
        }
    }

    pub fn is_major(&self) -> bool {
        matches!(self, KeyMode::Major)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyMode::Major => "major",
            KeyMode::Minor => "minor",
        }
    }
}

/// Result of tempo/key estimation for one waveform
#[derive(Debug, Clone, PartialEq)]
pub struct TempoKey {
    /// Global tempo, always > 0
    pub bpm: f32,
    pub key: KeyMode,
    /// Beat positions in seconds, ascending
    pub beat_times: Vec<f32>,
    /// Time-averaged chroma profile (each frame max-normalised)
    pub chroma_profile: [f32; PITCH_CLASSES],
}

/// Estimates tempo, beats and key from a mono waveform
pub struct TempoKeyEstimator {
    fft: FftProcessor,
    onset_detector: OnsetDetector,
    beat_tracker: BeatTracker,
    hop_size: usize,
    min_bpm: f32,
    max_bpm: f32,
    start_bpm: f32,
}

impl TempoKeyEstimator {
    pub fn new(config: &AnalysisConfig) -> Self {
        let start_bpm = if config.start_bpm > 0.0 {
            config.start_bpm
        } else {
            AnalysisConfig::default().start_bpm
        };

        Self {
            fft: FftProcessor::new(config.frame_size),
            onset_detector: OnsetDetector::new(),
            beat_tracker: BeatTracker::new(config.beat_tightness),
            hop_size: config.hop_size.max(1),
            min_bpm: config.min_bpm.max(1.0),
            max_bpm: config.max_bpm.max(config.min_bpm.max(1.0)),
            start_bpm,
        }
    }

    /// Estimate tempo, beats and key of `waveform`
    ///
    /// # Errors
    /// * `InsufficientSignal` - fewer samples than one analysis frame
    /// * `DecodeFailure` - the waveform carries a zero sample rate
    pub fn estimate(&self, waveform: &Waveform) -> Result<TempoKey, AnalysisError> {
        if waveform.sample_rate() == 0 {
            return Err(AnalysisError::DecodeFailure {
                path: String::from("<waveform>"),
                reason: "sample rate is zero".to_string(),
            });
        }
        if waveform.len() < self.fft.fft_size() {
            return Err(AnalysisError::InsufficientSignal {
                samples: waveform.len(),
                required: self.fft.fft_size(),
            });
        }

        let spectrogram = self
            .fft
            .stft(waveform.samples(), waveform.sample_rate(), self.hop_size);
        Ok(self.estimate_from_spectrogram(&spectrogram))
    }

    /// Estimate from an already computed spectrogram
    ///
    /// The feature extractor shares one spectrogram between this estimator
    /// and the spectral/MFCC stages.
    pub fn estimate_from_spectrogram(&self, spectrogram: &Spectrogram) -> TempoKey {
        let envelope = self.onset_detector.envelope(spectrogram);
        let onsets = self.onset_detector.pick_onsets(&envelope);
        let frame_rate = spectrogram.frame_rate();

        let (bpm, beat_times) = if onsets.is_empty() {
            log::debug!(
                "[TempoKeyEstimator] No onsets found, reporting prior tempo {} BPM",
                self.start_bpm
            );
            (self.start_bpm, Vec::new())
        } else {
            let bpm = self.estimate_bpm(&envelope, frame_rate);
            let period = 60.0 * frame_rate / bpm;
            let beat_times = self
                .beat_tracker
                .track(&envelope, period)
                .into_iter()
                .map(|frame| frame as f32 / frame_rate)
                .collect();
            (bpm, beat_times)
        };

        let chroma_profile =
            ChromaExtractor::new(spectrogram.sample_rate(), spectrogram.fft_size())
                .profile(spectrogram);
        let key = KeyMode::from_pitch_class(dominant_pitch_class(&chroma_profile));

        log::debug!(
            "[TempoKeyEstimator] {:.1} BPM, {} key, {} beats",
            bpm,
            key.as_str(),
            beat_times.len()
        );

        TempoKey {
            bpm,
            key,
            beat_times,
            chroma_profile,
        }
    }

    /// Tempo from the prior-weighted autocorrelation of the onset envelope
    ///
    /// Falls back to `start_bpm` when no lag carries any periodicity.
    fn estimate_bpm(&self, envelope: &[f32], frame_rate: f32) -> f32 {
        let min_lag = ((60.0 * frame_rate / self.max_bpm).ceil() as usize).max(1);
        let max_lag = ((60.0 * frame_rate / self.min_bpm).floor() as usize)
            .min(envelope.len().saturating_sub(1));

        let mut best: Option<(usize, f32)> = None;
        for lag in min_lag..=max_lag {
            let bpm = 60.0 * frame_rate / lag as f32;
            let score = autocorrelation(envelope, lag) * self.tempo_prior(bpm);
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((lag, score));
            }
        }

        match best {
            Some((lag, _)) => 60.0 * frame_rate / lag as f32,
            None => self.start_bpm,
        }
    }

    /// Log-normal prior: exp(-0.5 × log2(bpm / start_bpm)²)
    fn tempo_prior(&self, bpm: f32) -> f32 {
        (-0.5 * (bpm / self.start_bpm).log2().powi(2)).exp()
    }
}

/// Σ e[t] × e[t + lag]
fn autocorrelation(envelope: &[f32], lag: usize) -> f32 {
    envelope
        .iter()
        .zip(envelope.iter().skip(lag))
        .map(|(a, b)| a * b)
        .sum()
}
