// BatchProcessor - tags a collection of tracks with per-track fault isolation
//
// For each track: decode (under a wall-clock budget) → extract features →
// classify → record. Any failure is logged with the track name and failure
// kind and the track is left out of the mapping; no `unknown` placeholder is
// inserted and no single track can abort the batch.
//
// Tracks run sequentially by default. With `workers > 1` they are spread over
// a bounded rayon pool; every worker decides include/omit for its own track
// and the shared model is only read.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::analysis::classifier::{classify, MoodLabel};
use crate::analysis::features::FeatureExtractor;
use crate::audio::{decode_with_budget, AudioTrack, Decoder, FileDecoder};
use crate::config::{AppConfig, BatchConfig, TrainingConfig};
use crate::error::{AnalysisError, ErrorCode, TrainingError};
use crate::tags::MoodTagMapping;
use crate::training::{ClassifierTrainer, TrainedModel};

/// Discovers tracks directly inside a folder
pub struct TrackCatalog {
    root: PathBuf,
    extensions: Vec<String>,
    tag_file_name: String,
}

impl TrackCatalog {
    pub fn new<P: Into<PathBuf>>(root: P, config: &BatchConfig) -> Self {
        Self {
            root: root.into(),
            extensions: config
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            tag_file_name: config.tag_file_name.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Regular files with a configured extension (case-insensitive), sorted by name
    ///
    /// Subdirectories are not descended into and the tag file is never a track.
    pub fn discover(&self) -> Result<Vec<AudioTrack>> {
        let mut tracks = Vec::new();

        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to list folder {:?}", self.root))?;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let path = entry.path();
            if entry.file_name().to_string_lossy() == self.tag_file_name {
                continue;
            }
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
                .unwrap_or(false);
            if matches {
                tracks.push(AudioTrack::from_path(path));
            }
        }

        tracks.sort_by(|a, b| a.name().cmp(b.name()));
        log::info!(
            "[TrackCatalog] Found {} tracks in {:?}",
            tracks.len(),
            self.root
        );
        Ok(tracks)
    }
}

/// A track left out of the mapping, and why
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFailure {
    pub track: String,
    /// Stable failure kind, e.g. `decode_failure`
    pub kind: &'static str,
    pub code: i32,
    pub message: String,
}

impl TrackFailure {
    fn from_error(track: &AudioTrack, err: &AnalysisError) -> Self {
        Self {
            track: track.name().to_string(),
            kind: err.kind(),
            code: err.code(),
            message: err.message(),
        }
    }
}

/// Mapping plus the failures that were skipped to build it
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub mapping: MoodTagMapping,
    pub failures: Vec<TrackFailure>,
}

impl BatchOutcome {
    /// Tracks attempted (tagged + failed)
    pub fn attempted(&self) -> usize {
        self.mapping.len() + self.failures.len()
    }
}

/// Runs the extract → classify pipeline over many tracks
pub struct BatchProcessor {
    decoder: Arc<dyn Decoder>,
    extractor: FeatureExtractor,
    batch: BatchConfig,
    training: TrainingConfig,
}

impl BatchProcessor {
    pub fn new(config: &AppConfig, decoder: Arc<dyn Decoder>) -> Self {
        Self {
            decoder,
            extractor: FeatureExtractor::new(&config.analysis),
            batch: config.batch.clone(),
            training: config.training.clone(),
        }
    }

    /// Processor using the default hound/symphonia decoder
    pub fn with_file_decoder(config: &AppConfig) -> Self {
        Self::new(config, Arc::new(FileDecoder::new()))
    }

    /// Bootstrap model, used when the caller has no trained model
    pub fn bootstrap_model(&self) -> Result<TrainedModel, TrainingError> {
        ClassifierTrainer::new(self.training.clone()).train(&[])
    }

    /// Tag `tracks` with `model`, skipping (and logging) any track that fails
    pub fn process(&self, tracks: &[AudioTrack], model: &TrainedModel) -> MoodTagMapping {
        self.process_with_report(tracks, model).mapping
    }

    /// Like [`process`](Self::process), also returning the skipped tracks
    pub fn process_with_report(&self, tracks: &[AudioTrack], model: &TrainedModel) -> BatchOutcome {
        tracing::info!(
            "[BatchProcessor] Processing {} tracks ({} workers)",
            tracks.len(),
            self.batch.workers.max(1)
        );

        let results = self.run_all(tracks, model);

        let mut outcome = BatchOutcome::default();
        for (track, result) in tracks.iter().zip(results) {
            match result {
                Ok(_) if outcome.mapping.contains(track.name()) => {
                    let err = AnalysisError::DuplicateTrack {
                        track: track.name().to_string(),
                        path: track.path().display().to_string(),
                    };
                    tracing::warn!(
                        "[BatchProcessor] Skipping {}: kind={}, code={}, {}",
                        track.name(),
                        err.kind(),
                        err.code(),
                        err.message()
                    );
                    outcome.failures.push(TrackFailure::from_error(track, &err));
                }
                Ok(mood) => {
                    outcome.mapping.insert(track.name(), mood);
                }
                Err(err) => outcome.failures.push(TrackFailure::from_error(track, &err)),
            }
        }

        tracing::info!(
            "[BatchProcessor] Tagged {} tracks, skipped {}",
            outcome.mapping.len(),
            outcome.failures.len()
        );
        outcome
    }

    /// Discover the tracks in `folder` and tag them
    ///
    /// Without a `model` the bootstrap model is trained first; a trainer
    /// failure aborts the run because nothing could be classified.
    pub fn process_folder(&self, folder: &Path, model: Option<&TrainedModel>) -> Result<BatchOutcome> {
        let tracks = TrackCatalog::new(folder, &self.batch).discover()?;

        let bootstrap;
        let model = match model {
            Some(model) => model,
            None => {
                bootstrap = self
                    .bootstrap_model()
                    .context("Failed to build the bootstrap model")?;
                &bootstrap
            }
        };

        Ok(self.process_with_report(&tracks, model))
    }

    fn run_all(&self, tracks: &[AudioTrack], model: &TrainedModel) -> Vec<Result<MoodLabel, AnalysisError>> {
        let workers = self.batch.workers.max(1);
        if workers > 1 && tracks.len() > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|index| format!("mood-worker-{}", index))
                .build()
            {
                Ok(pool) => {
                    return pool.install(|| {
                        tracks
                            .par_iter()
                            .map(|track| self.process_track(track, model))
                            .collect()
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        "[BatchProcessor] Failed to build worker pool ({}), processing sequentially",
                        err
                    );
                }
            }
        }

        tracks
            .iter()
            .map(|track| self.process_track(track, model))
            .collect()
    }

    fn process_track(&self, track: &AudioTrack, model: &TrainedModel) -> Result<MoodLabel, AnalysisError> {
        let result = decode_with_budget(
            Arc::clone(&self.decoder),
            track.path(),
            self.extractor.config().max_duration_secs,
            self.decode_budget(),
        )
        .and_then(|waveform| self.extractor.extract_waveform(&waveform))
        .map_err(|err| AnalysisError::extraction(track.name(), err));

        match result {
            Ok(features) => {
                let mood = classify(model, Some(&features));
                tracing::info!("[BatchProcessor] Tagged {} as {}", track.name(), mood);
                Ok(mood)
            }
            Err(err) => {
                tracing::warn!(
                    "[BatchProcessor] Skipping {}: kind={}, code={}, {}",
                    track.name(),
                    err.kind(),
                    err.code(),
                    err.root_cause().message()
                );
                Err(err)
            }
        }
    }

    fn decode_budget(&self) -> Option<Duration> {
        (self.batch.decode_timeout_secs > 0)
            .then(|| Duration::from_secs(self.batch.decode_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Waveform;

    /// Returns a tone for every path except those containing "corrupt"
    struct FakeDecoder;

    impl Decoder for FakeDecoder {
        fn decode(&self, path: &Path, _max: f32) -> Result<Waveform, AnalysisError> {
            let name = path.to_string_lossy();
            if name.contains("corrupt") {
                return Err(AnalysisError::DecodeFailure {
                    path: name.into_owned(),
                    reason: "invalid header".to_string(),
                });
            }
            if name.contains("short") {
                return Ok(Waveform::new(vec![0.1; 100], 22050));
            }
            let freq = 200.0 + 50.0 * name.len() as f32;
            let samples = (0..22050)
                .map(|i| 0.4 * (2.0 * std::f32::consts::PI * freq * i as f32 / 22050.0).sin())
                .collect();
            Ok(Waveform::new(samples, 22050))
        }
    }

    fn test_config(workers: usize) -> AppConfig {
        let mut config = AppConfig::default();
        config.training.n_trees = 15;
        config.batch.workers = workers;
        config.batch.decode_timeout_secs = 0;
        config
    }

    fn processor(workers: usize) -> BatchProcessor {
        BatchProcessor::new(&test_config(workers), Arc::new(FakeDecoder))
    }

    fn tracks(names: &[&str]) -> Vec<AudioTrack> {
        names
            .iter()
            .map(|name| AudioTrack::from_path(format!("/music/{}", name)))
            .collect()
    }

    #[test]
    fn test_failed_tracks_are_omitted() {
        let processor = processor(1);
        let model = processor.bootstrap_model().unwrap();
        let tracks = tracks(&["a.mp3", "corrupt1.mp3", "b.mp3", "short.wav", "c.flac"]);

        let outcome = processor.process_with_report(&tracks, &model);

        assert_eq!(outcome.mapping.len(), 3);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.attempted(), tracks.len());
        for name in ["a.mp3", "b.mp3", "c.flac"] {
            assert!(outcome.mapping.contains(name), "{} missing", name);
            assert_ne!(outcome.mapping.get(name), Some(MoodLabel::Unknown));
        }
        assert!(!outcome.mapping.contains("corrupt1.mp3"));
        assert!(!outcome.mapping.contains("short.wav"));

        let kinds: Vec<&str> = outcome.failures.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec!["decode_failure", "insufficient_signal"]);
    }

    #[test]
    fn test_same_file_name_keeps_first_and_reports_duplicate() {
        let processor = processor(1);
        let model = processor.bootstrap_model().unwrap();
        let tracks = vec![
            AudioTrack::from_path("/a/song.mp3"),
            AudioTrack::from_path("/b/song.mp3"),
        ];

        let outcome = processor.process_with_report(&tracks, &model);

        assert_eq!(outcome.mapping.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.attempted(), tracks.len());
        assert_eq!(outcome.failures[0].track, "song.mp3");
        assert_eq!(outcome.failures[0].kind, "duplicate_track");

        let first = processor.process(&tracks[..1], &model);
        assert_eq!(outcome.mapping.get("song.mp3"), first.get("song.mp3"));
    }

    #[test]
    fn test_all_tracks_failing_yields_empty_mapping() {
        let processor = processor(1);
        let model = processor.bootstrap_model().unwrap();
        let mapping = processor.process(&tracks(&["corrupt_a.mp3", "corrupt_b.mp3"]), &model);
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let names = ["one.mp3", "two.mp3", "corrupt.mp3", "three.wav", "four.ogg"];
        let sequential = processor(1);
        let parallel = processor(3);
        let model = sequential.bootstrap_model().unwrap();

        let a = sequential.process(&tracks(&names), &model);
        let b = parallel.process(&tracks(&names), &model);
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn test_bootstrap_failure_aborts_folder_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(1);
        config.training.n_trees = 0;
        let processor = BatchProcessor::new(&config, Arc::new(FakeDecoder));

        assert!(processor.process_folder(dir.path(), None).is_err());
    }

    #[test]
    fn test_catalog_discovery() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.wav", "A.MP3", "notes.txt", "mood_tags.json", "c.Flac"] {
            fs::write(dir.path().join(name), b"data").unwrap();
        }
        fs::create_dir(dir.path().join("nested.mp3")).unwrap();

        let tracks = TrackCatalog::new(dir.path(), &BatchConfig::default())
            .discover()
            .unwrap();
        let names: Vec<&str> = tracks.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["A.MP3", "b.wav", "c.Flac"]);
    }

    #[test]
    fn test_catalog_missing_folder_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = TrackCatalog::new(dir.path().join("absent"), &BatchConfig::default());
        assert!(catalog.discover().is_err());
    }

    #[test]
    fn test_process_folder_uses_discovered_tracks() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["x.mp3", "corrupt.mp3", "y.wav"] {
            fs::write(dir.path().join(name), b"data").unwrap();
        }

        let outcome = processor(1).process_folder(dir.path(), None).unwrap();
        assert_eq!(outcome.mapping.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].track, "corrupt.mp3");
    }
}
