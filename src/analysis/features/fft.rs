// FFT module - Short-time Fourier transform
//
// This module handles FFT computation with Hann windowing to reduce
// spectral leakage. Every analysis stage (onset strength, chroma, MFCC,
// spectral shape) reads from the same magnitude spectrogram, so a track is
// transformed exactly once.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// FFT processor that computes magnitude spectra from audio frames
pub struct FftProcessor {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    /// Hann window for FFT (pre-computed)
    window: Vec<f32>,
}

impl FftProcessor {
    /// Create a new FFT processor
    ///
    /// # Arguments
    /// * `fft_size` - FFT frame size (typically 2048)
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size.max(2);
        let window = (0..fft_size)
            .map(|i| {
                0.5 * (1.0
                    - ((2.0 * std::f32::consts::PI * i as f32) / (fft_size as f32 - 1.0)).cos())
            })
            .collect();

        Self {
            fft: FftPlanner::new().plan_fft_forward(fft_size),
            fft_size,
            window,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Compute magnitude spectrum of one frame
    ///
    /// Frames shorter than the FFT size are zero-padded; longer frames are
    /// cut to the FFT size.
    ///
    /// # Returns
    /// Magnitude spectrum (size = fft_size / 2 + 1)
    pub fn compute_magnitude_spectrum(&self, audio: &[f32]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = audio
            .iter()
            .take(self.fft_size)
            .zip(self.window.iter())
            .map(|(sample, window_val)| Complex::new(sample * window_val, 0.0))
            .collect();
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        buffer[..self.fft_size / 2 + 1]
            .iter()
            .map(|c| c.norm())
            .collect()
    }

    /// Magnitude spectrogram over all full frames of `samples`
    ///
    /// Frames start every `hop_size` samples; a trailing partial frame is
    /// dropped, so `samples` shorter than one frame yields no frames.
    pub fn stft(&self, samples: &[f32], sample_rate: u32, hop_size: usize) -> Spectrogram {
        let hop_size = hop_size.max(1);
        let frames = frame_starts(samples.len(), self.fft_size, hop_size)
            .map(|start| self.compute_magnitude_spectrum(&samples[start..start + self.fft_size]))
            .collect();

        Spectrogram {
            frames,
            sample_rate,
            fft_size: self.fft_size,
            hop_size,
        }
    }
}

/// Start offsets of every full frame in a signal of `len` samples
pub fn frame_starts(len: usize, frame_size: usize, hop_size: usize) -> impl Iterator<Item = usize> {
    let last = len.checked_sub(frame_size);
    (0..=last.unwrap_or(0))
        .step_by(hop_size.max(1))
        .take_while(move |_| last.is_some())
}

/// Magnitude spectra of consecutive frames
#[derive(Debug, Clone)]
pub struct Spectrogram {
    frames: Vec<Vec<f32>>,
    sample_rate: u32,
    fft_size: usize,
    hop_size: usize,
}

impl Spectrogram {
    pub fn frames(&self) -> &[Vec<f32>] {
        &self.frames
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Centre frequency of bin `k` in Hz
    pub fn bin_frequency(&self, k: usize) -> f32 {
        k as f32 * self.sample_rate as f32 / self.fft_size as f32
    }

    /// Frames per second
    pub fn frame_rate(&self) -> f32 {
        self.sample_rate as f32 / self.hop_size as f32
    }
}
