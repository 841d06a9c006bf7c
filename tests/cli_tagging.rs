use std::fs;
use std::path::Path;
use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mood_tagger"))
}

fn write_tone(path: &Path, freq: f32, seconds: f32) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..(seconds * 22050.0) as usize {
        let t = i as f32 / 22050.0;
        let pulse = if i % 11025 < 300 { 0.4 } else { 0.0 };
        let sample = 0.3 * (2.0 * std::f32::consts::PI * freq * t).sin() + pulse;
        let value = (sample * 20000.0) as i16;
        writer.write_sample(value).unwrap();
        writer.write_sample(value).unwrap();
    }
    writer.finalize().unwrap();
}

fn music_folder() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_tone(&dir.path().join("first.wav"), 261.63, 2.0);
    write_tone(&dir.path().join("second.wav"), 440.0, 2.0);
    write_tone(&dir.path().join("third.wav"), 349.23, 2.0);
    fs::write(dir.path().join("damaged.mp3"), b"definitely not an mp3 stream").unwrap();
    dir
}

fn stdout_json(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).expect("stdout UTF-8");
    serde_json::from_str(stdout.trim()).expect("JSON report on stdout")
}

#[test]
fn tag_writes_tag_file_and_skips_corrupt_track() {
    let dir = music_folder();

    let output = cli()
        .arg("tag")
        .arg(dir.path())
        .output()
        .expect("failed to run mood_tagger tag");
    assert!(
        output.status.success(),
        "CLI exited with {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );

    let report = stdout_json(&output);
    assert_eq!(report["reused"], false);
    assert_eq!(report["tagged"], 3);
    assert_eq!(report["failures"][0]["track"], "damaged.mp3");

    let tags: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("mood_tags.json")).unwrap())
            .unwrap();
    let tags = tags.as_object().expect("tag file is a JSON object");
    assert_eq!(tags.len(), 3);
    assert!(!tags.contains_key("damaged.mp3"));
}

#[test]
fn tag_reuses_existing_tag_file() {
    let dir = music_folder();
    assert!(cli().arg("tag").arg(dir.path()).status().unwrap().success());
    let first = fs::read_to_string(dir.path().join("mood_tags.json")).unwrap();

    // A new track is ignored until --force is given
    write_tone(&dir.path().join("fourth.wav"), 392.0, 2.0);
    let output = cli().arg("tag").arg(dir.path()).output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["reused"], true);
    assert_eq!(fs::read_to_string(dir.path().join("mood_tags.json")).unwrap(), first);

    let output = cli()
        .arg("tag")
        .arg(dir.path())
        .arg("--force")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["tagged"], 4);
}

#[test]
fn tag_warns_when_model_flags_are_ignored() {
    let dir = music_folder();
    assert!(cli().arg("tag").arg(dir.path()).status().unwrap().success());

    let saved = dir.path().join("model.json");
    let output = cli()
        .arg("tag")
        .arg(dir.path())
        .arg("--save-model")
        .arg(&saved)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["reused"], true);
    assert!(String::from_utf8_lossy(&output.stderr).contains("--save-model ignored"));
    assert!(!saved.exists());
}

#[test]
fn show_lists_mood_queue() {
    let dir = music_folder();
    assert!(cli().arg("tag").arg(dir.path()).status().unwrap().success());

    let output = cli().arg("show").arg(dir.path()).output().unwrap();
    assert!(output.status.success());
    let counts = stdout_json(&output);
    let total: u64 = counts
        .as_object()
        .unwrap()
        .values()
        .map(|v| v.as_u64().unwrap())
        .sum();
    assert_eq!(total, 3);

    let mut listed = 0;
    for mood in ["sad", "happy", "vibe", "motivation"] {
        let output = cli()
            .arg("show")
            .arg(dir.path())
            .args(["--mood", mood])
            .output()
            .unwrap();
        assert!(output.status.success());
        listed += String::from_utf8(output.stdout).unwrap().lines().count();
    }
    assert_eq!(listed, 3);
}

#[test]
fn features_prints_full_vector() {
    let dir = music_folder();
    let output = cli()
        .arg("features")
        .arg(dir.path().join("second.wav"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let payload = stdout_json(&output);
    assert_eq!(payload["track"], "second.wav");
    assert_eq!(payload["features"].as_array().unwrap().len(), 21);
    assert_eq!(payload["slots"][0], "bpm");
}

#[test]
fn features_fails_on_corrupt_file() {
    let dir = music_folder();
    let output = cli()
        .arg("features")
        .arg(dir.path().join("damaged.mp3"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn train_then_tag_with_saved_model() {
    let dir = music_folder();
    let samples = dir.path().join("samples.json");
    let mut entries = Vec::new();
    for (slot, mood) in ["sad", "happy", "vibe", "motivation"].iter().enumerate() {
        let mut features = vec![0.0; 21];
        features[slot] = 1.0;
        entries.push(serde_json::json!({ "mood": mood, "features": features }));
    }
    fs::write(&samples, serde_json::to_string(&entries).unwrap()).unwrap();

    let model = dir.path().join("model.json");
    let output = cli()
        .arg("train")
        .arg("--samples")
        .arg(&samples)
        .arg("--output")
        .arg(&model)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(model.is_file());

    let output = cli()
        .arg("tag")
        .arg(dir.path())
        .arg("--model")
        .arg(&model)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["tagged"], 3);
}

#[test]
fn train_rejects_unknown_label() {
    let dir = tempfile::tempdir().unwrap();
    let samples = dir.path().join("samples.json");
    let entry = serde_json::json!([{ "mood": "unknown", "features": vec![0.0; 21] }]);
    fs::write(&samples, entry.to_string()).unwrap();

    let output = cli()
        .arg("train")
        .arg("--samples")
        .arg(&samples)
        .arg("--output")
        .arg(dir.path().join("model.json"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("model.json").exists());
}

#[test]
fn tag_missing_folder_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = cli()
        .arg("tag")
        .arg(dir.path().join("nowhere"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}
