use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mood_tagger::batch::{BatchProcessor, TrackFailure};
use mood_tagger::analysis::features::FEATURE_NAMES;
use mood_tagger::error::{log_analysis_error, log_training_error};
use mood_tagger::{
    load_model, load_tags, save_model, save_tags, AppConfig, AudioTrack, ClassifierTrainer,
    FeatureExtractor, FeatureVector, FileDecoder, LabeledSample, MoodLabel, TrainedModel,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "mood_tagger",
    about = "Tag a folder of audio tracks with coarse mood labels"
)]
struct Cli {
    /// JSON configuration file (defaults are used when absent or invalid)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tag every track in a folder and write the tag file next to them
    Tag {
        folder: PathBuf,
        /// Re-process even if the folder already has a tag file
        #[arg(long)]
        force: bool,
        /// Classify with a saved model instead of the bootstrap model
        #[arg(long)]
        model: Option<PathBuf>,
        /// Save the model used for this run
        #[arg(long)]
        save_model: Option<PathBuf>,
        /// Worker threads (overrides the config)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Print the tracks tagged with a mood, or the per-mood counts
    Show {
        folder: PathBuf,
        #[arg(long)]
        mood: Option<MoodLabel>,
    },
    /// Print the feature vector of one track as JSON
    Features { file: PathBuf },
    /// Train a model from labeled feature vectors and save it
    Train {
        /// JSON array of {"mood": ..., "features": [21 numbers]}
        #[arg(long)]
        samples: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = cli
        .config
        .as_ref()
        .map(AppConfig::load_from_file)
        .unwrap_or_default();

    match cli.command {
        Commands::Tag {
            folder,
            force,
            model,
            save_model,
            workers,
        } => run_tag(config, &folder, force, model, save_model, workers),
        Commands::Show { folder, mood } => run_show(&config, &folder, mood),
        Commands::Features { file } => run_features(&config, &file),
        Commands::Train { samples, output } => run_train(&config, &samples, &output),
    }
}

fn run_tag(
    mut config: AppConfig,
    folder: &Path,
    force: bool,
    model_path: Option<PathBuf>,
    save_model_path: Option<PathBuf>,
    workers: Option<usize>,
) -> Result<ExitCode> {
    if let Some(workers) = workers {
        config.batch.workers = workers;
    }
    let tag_path = folder.join(&config.batch.tag_file_name);

    if tag_path.exists() && !force {
        if model_path.is_some() || save_model_path.is_some() {
            tracing::warn!(
                "[CLI] --model/--save-model ignored: {} already exists (pass --force to re-process)",
                tag_path.display()
            );
        }
        let mapping = load_tags(&tag_path)?;
        tracing::info!(
            "[CLI] Using existing tags from {} (pass --force to re-process)",
            tag_path.display()
        );
        emit_report(&TagReport {
            folder: folder.display().to_string(),
            reused: true,
            tagged: mapping.len(),
            counts: count_names(&mapping.mood_counts()),
            failures: Vec::new(),
        })?;
        return Ok(ExitCode::from(0));
    }

    let processor = BatchProcessor::with_file_decoder(&config);
    let model = match model_path {
        Some(path) => load_model(&path)?,
        None => bootstrap(&processor)?,
    };

    let outcome = processor
        .process_folder(folder, Some(&model))
        .with_context(|| format!("processing folder {}", folder.display()))?;
    save_tags(&tag_path, &outcome.mapping)?;

    if let Some(path) = save_model_path {
        save_model(&path, &model)?;
    }

    emit_report(&TagReport {
        folder: folder.display().to_string(),
        reused: false,
        tagged: outcome.mapping.len(),
        counts: count_names(&outcome.mapping.mood_counts()),
        failures: outcome.failures.iter().map(FailureEntry::from).collect(),
    })?;
    Ok(ExitCode::from(0))
}

fn bootstrap(processor: &BatchProcessor) -> Result<TrainedModel> {
    processor.bootstrap_model().map_err(|err| {
        log_training_error(&err, "bootstrap model");
        anyhow::Error::new(err).context("building the bootstrap model")
    })
}

fn run_show(config: &AppConfig, folder: &Path, mood: Option<MoodLabel>) -> Result<ExitCode> {
    let tag_path = folder.join(&config.batch.tag_file_name);
    let mapping = load_tags(&tag_path)?;

    match mood {
        Some(mood) => {
            for name in mapping.queue_for(mood) {
                println!("{name}");
            }
        }
        None => {
            let json = serde_json::to_string_pretty(&count_names(&mapping.mood_counts()))?;
            println!("{json}");
        }
    }
    Ok(ExitCode::from(0))
}

fn run_features(config: &AppConfig, file: &Path) -> Result<ExitCode> {
    let track = AudioTrack::from_path(file);
    let extractor = FeatureExtractor::new(&config.analysis);

    let features = extractor
        .extract_track(&track, &FileDecoder::new())
        .map_err(|err| {
            log_analysis_error(&err, track.name());
            anyhow::Error::new(err)
        })?;

    let payload = FeaturesPayload {
        track: track.name(),
        slots: &FEATURE_NAMES,
        features,
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(ExitCode::from(0))
}

fn run_train(config: &AppConfig, samples_path: &Path, output: &Path) -> Result<ExitCode> {
    let contents = fs::read_to_string(samples_path)
        .with_context(|| format!("reading samples {}", samples_path.display()))?;
    let samples: Vec<LabeledSample> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing samples {}", samples_path.display()))?;

    let model = ClassifierTrainer::new(config.training.clone())
        .train(&samples)
        .map_err(|err| {
            log_training_error(&err, "train");
            anyhow::Error::new(err)
        })?;
    save_model(output, &model)?;

    println!(
        "Trained {} trees on {} samples -> {}",
        model.n_trees(),
        samples.len(),
        output.display()
    );
    Ok(ExitCode::from(0))
}

fn count_names(counts: &BTreeMap<MoodLabel, usize>) -> BTreeMap<String, usize> {
    counts
        .iter()
        .map(|(mood, count)| (mood.to_string(), *count))
        .collect()
}

fn emit_report(report: &TagReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

#[derive(Serialize)]
struct TagReport {
    folder: String,
    reused: bool,
    tagged: usize,
    counts: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<FailureEntry>,
}

#[derive(Serialize)]
struct FailureEntry {
    track: String,
    kind: &'static str,
    message: String,
}

impl From<&TrackFailure> for FailureEntry {
    fn from(failure: &TrackFailure) -> Self {
        Self {
            track: failure.track.clone(),
            kind: failure.kind,
            message: failure.message.clone(),
        }
    }
}

#[derive(Serialize)]
struct FeaturesPayload<'a> {
    track: &'a str,
    slots: &'static [&'static str],
    features: FeatureVector,
}
