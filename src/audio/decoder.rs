// Decoder - file path to mono waveform
//
// WAV files are read with hound; everything else (mp3, flac, ogg, m4a) goes
// through symphonia's probe + codec registry. Multichannel audio is
// downmixed to mono by averaging the channels of each frame, and decoding
// stops once the requested duration has been collected.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::{max_samples_for, Waveform};
use crate::error::AnalysisError;

/// Narrow decoding contract the feature extractor depends on
pub trait Decoder: Send + Sync {
    /// Decode at most the first `max_duration_secs` of `path` to mono samples
    fn decode(&self, path: &Path, max_duration_secs: f32) -> Result<Waveform, AnalysisError>;
}

/// Default decoder backed by hound (WAV) and symphonia (compressed formats)
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDecoder;

impl FileDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for FileDecoder {
    fn decode(&self, path: &Path, max_duration_secs: f32) -> Result<Waveform, AnalysisError> {
        let is_wav = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("wav"))
            .unwrap_or(false);

        let waveform = if is_wav {
            read_wav(path, max_duration_secs)?
        } else {
            read_compressed(path, max_duration_secs)?
        };

        log::debug!(
            "[Decoder] {} -> {} samples at {} Hz ({:.2}s)",
            path.display(),
            waveform.len(),
            waveform.sample_rate(),
            waveform.duration_secs()
        );
        Ok(waveform)
    }
}

/// Decode `path` on a helper thread, giving up after `budget`
///
/// A decoder that overruns its budget is abandoned (its thread finishes in
/// the background) and the track is reported as a decode failure. `None`
/// decodes inline without a budget. The result never exceeds
/// `max_duration_secs`, whatever the decoder returned.
pub fn decode_with_budget(
    decoder: Arc<dyn Decoder>,
    path: &Path,
    max_duration_secs: f32,
    budget: Option<Duration>,
) -> Result<Waveform, AnalysisError> {
    let mut waveform = match budget {
        Some(budget) => decode_on_thread(decoder, path, max_duration_secs, budget)?,
        None => decoder.decode(path, max_duration_secs)?,
    };
    waveform.truncate_to(max_duration_secs);
    Ok(waveform)
}

fn decode_on_thread(
    decoder: Arc<dyn Decoder>,
    path: &Path,
    max_duration_secs: f32,
    budget: Duration,
) -> Result<Waveform, AnalysisError> {
    let (tx, rx) = mpsc::channel();
    let owned_path: PathBuf = path.to_path_buf();
    thread::Builder::new()
        .name("mood-decode".to_string())
        .spawn(move || {
            // Receiver may already have timed out; nothing to do then.
            let _ = tx.send(decoder.decode(&owned_path, max_duration_secs));
        })
        .map_err(|err| decode_failure(path, err))?;

    match rx.recv_timeout(budget) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(decode_failure(
            path,
            format!("decoding exceeded the {} ms budget", budget.as_millis()),
        )),
        Err(RecvTimeoutError::Disconnected) => {
            Err(decode_failure(path, "decoder thread terminated unexpectedly"))
        }
    }
}

fn decode_failure(path: &Path, reason: impl ToString) -> AnalysisError {
    AnalysisError::DecodeFailure {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn read_wav(path: &Path, max_duration_secs: f32) -> Result<Waveform, AnalysisError> {
    let mut reader = hound::WavReader::open(path).map_err(|err| decode_failure(path, err))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;
    let limit = max_samples_for(max_duration_secs, spec.sample_rate).saturating_mul(channels);

    let interleaved = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .take(limit)
            .collect::<Result<Vec<f32>, _>>(),
        hound::SampleFormat::Int => {
            let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
            match spec.bits_per_sample {
                8 => read_int_samples::<_, i8>(&mut reader, limit, max),
                16 => read_int_samples::<_, i16>(&mut reader, limit, max),
                24 | 32 => read_int_samples::<_, i32>(&mut reader, limit, max),
                other => {
                    return Err(decode_failure(
                        path,
                        format!("unsupported bits per sample {}", other),
                    ))
                }
            }
        }
    }
    .map_err(|err| decode_failure(path, err))?;

    Ok(Waveform::new(
        downmix(&interleaved, channels),
        spec.sample_rate,
    ))
}

fn read_int_samples<R, S>(
    reader: &mut hound::WavReader<R>,
    limit: usize,
    max: f32,
) -> Result<Vec<f32>, hound::Error>
where
    R: Read,
    S: hound::Sample + Into<i32>,
{
    reader
        .samples::<S>()
        .take(limit)
        .map(|sample| {
            sample.map(|value| {
                let value: i32 = value.into();
                value as f32 / max
            })
        })
        .collect()
}

fn read_compressed(path: &Path, max_duration_secs: f32) -> Result<Waveform, AnalysisError> {
    let file = File::open(path).map_err(|err| decode_failure(path, err))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| decode_failure(path, err))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_failure(path, "no audio track found"))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| decode_failure(path, "sample rate not specified"))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|err| decode_failure(path, err))?;

    let limit = max_samples_for(max_duration_secs, sample_rate);
    let mut mono = Vec::new();

    while mono.len() < limit {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(err) => return Err(decode_failure(path, err)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channels = spec.channels.count().max(1);
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                mono.extend(downmix(buffer.samples(), channels));
            }
            Err(SymphoniaError::DecodeError(reason)) => {
                log::debug!(
                    "[Decoder] Skipping corrupt packet in {}: {}",
                    path.display(),
                    reason
                );
            }
            Err(err) => return Err(decode_failure(path, err)),
        }
    }

    let mut waveform = Waveform::new(mono, sample_rate);
    waveform.truncate_to(max_duration_secs);
    Ok(waveform)
}
