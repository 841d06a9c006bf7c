// FeatureExtractor - fixed-length track fingerprint for mood classification
//
// This module turns a decoded waveform into the 21-slot `FeatureVector` the
// classifier is trained on. Every stage reads from one shared magnitude
// spectrogram (or the matching time-domain frames), so a track is transformed
// once.
//
// Module organization:
// - types: FeatureVector, TrackFeatures, slot layout
// - fft: STFT with Hann windowing
// - spectral: Frequency-domain features (centroid, rolloff)
// - temporal: Time-domain features (ZCR, RMS)
// - chroma: Pitch-class profile (key heuristic, valence)
// - mfcc: Mel-frequency cepstral coefficients
// - mod.rs: Coordinator (FeatureExtractor)
//
// Slots:
//  0     BPM (tempo estimator)
//  1     Key is major (1.0 / 0.0)
//  2     Mean RMS energy
//  3     Mean spectral centroid (Hz)
//  4     Mean spectral roll-off (Hz)
//  5     Mean zero-crossing rate
//  6     Valence proxy: mean chroma-profile magnitude
//  7     Tempo stability: std-dev of inter-beat intervals (s)
//  8-20  Mean MFCCs 0..12
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description
// - Lerch, A. (2012). An Introduction to Audio Content Analysis

mod chroma;
mod fft;
mod mfcc;
mod spectral;
mod temporal;
mod types;

pub use chroma::{dominant_pitch_class, pitch_class, ChromaExtractor, PITCH_CLASSES};
pub use fft::{frame_starts, FftProcessor, Spectrogram};
pub use types::{slot, FeatureVector, TrackFeatures, FEATURE_COUNT, FEATURE_NAMES, MFCC_COUNT};

use crate::analysis::beat::interval_std_dev;
use crate::analysis::tempo::TempoKeyEstimator;
use crate::audio::{max_samples_for, AudioTrack, Decoder, Waveform};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use mfcc::MfccExtractor;
use spectral::SpectralFeatures;
use temporal::{compute_rms, compute_zcr};

/// FeatureExtractor coordinates the feature extraction pipeline
///
/// Frame size, hop size and mel band count come from the configuration and
/// stay fixed for the extractor's lifetime, so vectors from one run are
/// comparable with each other and with the model trained on them.
pub struct FeatureExtractor {
    fft_processor: FftProcessor,
    tempo_key: TempoKeyEstimator,
    config: AnalysisConfig,
}

impl FeatureExtractor {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            fft_processor: FftProcessor::new(config.frame_size),
            tempo_key: TempoKeyEstimator::new(config),
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Decode `track` and extract its feature vector
    ///
    /// Every failure, decode errors included, is reported as
    /// `ExtractionFailure` naming the track.
    pub fn extract_track(
        &self,
        track: &AudioTrack,
        decoder: &dyn Decoder,
    ) -> Result<FeatureVector, AnalysisError> {
        let waveform = decoder
            .decode(track.path(), self.config.max_duration_secs)
            .map_err(|err| AnalysisError::extraction(track.name(), err))?;

        self.extract_waveform(&waveform)
            .map_err(|err| AnalysisError::extraction(track.name(), err))
    }

    /// Extract the feature vector of an already decoded waveform
    ///
    /// Only the first `max_duration_secs` of audio are analysed.
    ///
    /// # Errors
    /// * `InsufficientSignal` - fewer samples than one analysis frame
    /// * `DecodeFailure` - the waveform carries a zero sample rate
    /// * `NonFiniteFeature` - a slot came out as NaN or infinity
    pub fn extract_waveform(&self, waveform: &Waveform) -> Result<FeatureVector, AnalysisError> {
        let frame_size = self.fft_processor.fft_size();
        let sample_rate = waveform.sample_rate();
        let limit = max_samples_for(self.config.max_duration_secs, sample_rate).min(waveform.len());
        let samples = &waveform.samples()[..limit];

        if sample_rate == 0 {
            return Err(AnalysisError::DecodeFailure {
                path: String::from("<waveform>"),
                reason: "sample rate is zero".to_string(),
            });
        }
        if samples.len() < frame_size {
            return Err(AnalysisError::InsufficientSignal {
                samples: samples.len(),
                required: frame_size,
            });
        }

        let spectrogram = self
            .fft_processor
            .stft(samples, sample_rate, self.config.hop_size);
        let tempo_key = self.tempo_key.estimate_from_spectrogram(&spectrogram);

        // Time-domain features over the same frames as the spectrogram
        let mut rms_sum = 0.0f64;
        let mut zcr_sum = 0.0f64;
        let mut frame_count = 0usize;
        for start in frame_starts(samples.len(), frame_size, spectrogram.hop_size()) {
            let frame = &samples[start..start + frame_size];
            rms_sum += compute_rms(frame) as f64;
            zcr_sum += compute_zcr(frame) as f64;
            frame_count += 1;
        }

        let spectral = SpectralFeatures::new(sample_rate, frame_size, self.config.rolloff_percent);
        let mut centroid_sum = 0.0f64;
        let mut rolloff_sum = 0.0f64;
        for spectrum in spectrogram.frames() {
            centroid_sum += spectral.compute_centroid(spectrum) as f64;
            rolloff_sum += spectral.compute_rolloff(spectrum) as f64;
        }

        let mfcc = MfccExtractor::new(sample_rate, frame_size, self.config.n_mels)
            .mean_mfcc(spectrogram.frames());

        let frames = frame_count.max(1) as f64;
        let features = TrackFeatures {
            bpm: tempo_key.bpm as f64,
            key_is_major: tempo_key.key.is_major(),
            rms: rms_sum / frames,
            spectral_centroid: centroid_sum / frames,
            spectral_rolloff: rolloff_sum / frames,
            zero_crossing_rate: zcr_sum / frames,
            valence: tempo_key.chroma_profile.iter().map(|&v| v as f64).sum::<f64>()
                / PITCH_CLASSES as f64,
            tempo_stability: interval_std_dev(&tempo_key.beat_times),
            mfcc,
        };

        let vector = features.to_vector();
        if let Some(slot) = vector.first_non_finite() {
            return Err(AnalysisError::NonFiniteFeature { slot });
        }

        log::debug!(
            "[FeatureExtractor] {} frames, {:.1} BPM, rms {:.4}, centroid {:.0} Hz",
            frame_count,
            features.bpm,
            features.rms,
            features.spectral_centroid
        );

        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const SAMPLE_RATE: u32 = 22050;

    /// Generate pure sine wave for testing
    fn generate_sine_wave(frequency: f32, duration_samples: usize) -> Waveform {
        let samples = (0..duration_samples)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                0.5 * (2.0 * std::f32::consts::PI * frequency * t).sin()
            })
            .collect();
        Waveform::new(samples, SAMPLE_RATE)
    }

    /// Generate white noise for testing
    fn generate_white_noise(duration_samples: usize) -> Waveform {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let samples = (0..duration_samples)
            .map(|_| rng.gen_range(-0.5..0.5))
            .collect();
        Waveform::new(samples, SAMPLE_RATE)
    }

    struct FixedDecoder(Result<Waveform, AnalysisError>);

    impl Decoder for FixedDecoder {
        fn decode(&self, _path: &Path, _max: f32) -> Result<Waveform, AnalysisError> {
            self.0.clone()
        }
    }

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(&AnalysisConfig::default())
    }

    #[test]
    fn test_vector_has_all_slots() {
        let vector = extractor()
            .extract_waveform(&generate_sine_wave(440.0, SAMPLE_RATE as usize * 2))
            .unwrap();

        assert_eq!(vector.as_array().len(), FEATURE_COUNT);
        assert!(vector.first_non_finite().is_none());
        assert!(vector.bpm() > 0.0);
        // A4 is not C, F or G
        assert!(!vector.key_is_major());
        assert!((vector.rms() - 0.5 / 2f64.sqrt()).abs() < 0.02);
    }

    #[test]
    fn test_extract_with_silence() {
        let silence = Waveform::new(vec![0.0; SAMPLE_RATE as usize * 3], SAMPLE_RATE);
        let vector = extractor().extract_waveform(&silence).unwrap();

        assert_eq!(vector.rms(), 0.0, "RMS should be 0 for silence");
        assert_eq!(vector.zero_crossing_rate(), 0.0, "ZCR should be 0 for silence");
        assert_eq!(vector.get(slot::SPECTRAL_CENTROID), 0.0);
        assert_eq!(vector.get(slot::VALENCE), 0.0);
        assert_eq!(vector.get(slot::TEMPO_STABILITY), 0.0);
        assert_eq!(vector.bpm(), 120.0);
        assert!(vector.first_non_finite().is_none());

        // Deterministic across calls
        assert_eq!(extractor().extract_waveform(&silence).unwrap(), vector);
    }

    #[test]
    fn test_extract_with_short_audio() {
        let short = generate_sine_wave(440.0, 512);
        let err = extractor().extract_waveform(&short).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientSignal {
                samples: 512,
                required: 2048
            }
        );
    }

    #[test]
    fn test_centroid_low_vs_high_frequency() {
        let low = extractor()
            .extract_waveform(&generate_sine_wave(200.0, 8192))
            .unwrap();
        let high = extractor()
            .extract_waveform(&generate_sine_wave(5000.0, 8192))
            .unwrap();

        assert!(low.get(slot::SPECTRAL_CENTROID) < 1000.0);
        assert!(high.get(slot::SPECTRAL_CENTROID) > 3000.0);
        assert!(high.get(slot::SPECTRAL_ROLLOFF) > low.get(slot::SPECTRAL_ROLLOFF));
    }

    #[test]
    fn test_zcr_sine_vs_noise() {
        let sine = extractor()
            .extract_waveform(&generate_sine_wave(100.0, 8192))
            .unwrap();
        let noise = extractor()
            .extract_waveform(&generate_white_noise(8192))
            .unwrap();

        assert!(
            noise.zero_crossing_rate() > 0.3,
            "Expected noise ZCR > 0.3, got {}",
            noise.zero_crossing_rate()
        );
        assert!(
            sine.zero_crossing_rate() < 0.1,
            "Expected sine ZCR < 0.1, got {}",
            sine.zero_crossing_rate()
        );
    }

    #[test]
    fn test_only_leading_audio_is_analysed() {
        let config = AnalysisConfig {
            max_duration_secs: 1.0,
            ..AnalysisConfig::default()
        };
        let mut samples = generate_sine_wave(440.0, SAMPLE_RATE as usize).samples().to_vec();
        let head_only = FeatureExtractor::new(&config)
            .extract_waveform(&Waveform::new(samples.clone(), SAMPLE_RATE))
            .unwrap();

        samples.extend(std::iter::repeat(0.9).take(SAMPLE_RATE as usize));
        let with_tail = FeatureExtractor::new(&config)
            .extract_waveform(&Waveform::new(samples, SAMPLE_RATE))
            .unwrap();

        assert_eq!(head_only, with_tail);
    }

    #[test]
    fn test_extract_track_wraps_failures() {
        let track = AudioTrack::from_path("/music/broken.mp3");
        let decoder = FixedDecoder(Err(AnalysisError::DecodeFailure {
            path: "/music/broken.mp3".to_string(),
            reason: "corrupt frame".to_string(),
        }));

        let err = extractor().extract_track(&track, &decoder).unwrap_err();
        match &err {
            AnalysisError::ExtractionFailure { track, .. } => assert_eq!(track, "broken.mp3"),
            other => panic!("expected ExtractionFailure, got {:?}", other),
        }
        assert_eq!(err.kind(), "decode_failure");

        let short = FixedDecoder(Ok(Waveform::new(vec![0.0; 10], SAMPLE_RATE)));
        let err = extractor().extract_track(&track, &short).unwrap_err();
        assert_eq!(err.kind(), "insufficient_signal");
    }
}
