// Tags module - track name → mood mapping and its JSON file
//
// The mapping is what the batch processor produces and what the player reads
// back to build mood-filtered queues. On disk it is a UTF-8, indented JSON
// object: { "file name": "mood", ... }.

use crate::analysis::classifier::MoodLabel;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Track file name → mood label, unique keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoodTagMapping {
    tags: BTreeMap<String, MoodLabel>,
}

impl MoodTagMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `mood` for `track`, returning the previous label if any
    pub fn insert(&mut self, track: impl Into<String>, mood: MoodLabel) -> Option<MoodLabel> {
        self.tags.insert(track.into(), mood)
    }

    pub fn get(&self, track: &str) -> Option<MoodLabel> {
        self.tags.get(track).copied()
    }

    pub fn contains(&self, track: &str) -> bool {
        self.tags.contains_key(track)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, MoodLabel)> {
        self.tags.iter().map(|(name, mood)| (name.as_str(), *mood))
    }

    /// Track names tagged with `mood`, sorted
    pub fn queue_for(&self, mood: MoodLabel) -> Vec<&str> {
        self.iter()
            .filter(|(_, label)| *label == mood)
            .map(|(name, _)| name)
            .collect()
    }

    /// Number of tracks per mood; moods with no tracks are omitted
    pub fn mood_counts(&self) -> BTreeMap<MoodLabel, usize> {
        let mut counts = BTreeMap::new();
        for (_, mood) in self.iter() {
            *counts.entry(mood).or_insert(0) += 1;
        }
        counts
    }
}

impl FromIterator<(String, MoodLabel)> for MoodTagMapping {
    fn from_iter<I: IntoIterator<Item = (String, MoodLabel)>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

impl Extend<(String, MoodLabel)> for MoodTagMapping {
    fn extend<I: IntoIterator<Item = (String, MoodLabel)>>(&mut self, iter: I) {
        self.tags.extend(iter);
    }
}

/// Write `mapping` to `path` as indented JSON
pub fn save_tags<P: AsRef<Path>>(path: P, mapping: &MoodTagMapping) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(mapping).context("Failed to serialize mood tags")?;
    fs::write(path, json).with_context(|| format!("Failed to write mood tags to {:?}", path))?;
    log::info!("[Tags] Saved {} tags to {:?}", mapping.len(), path);
    Ok(())
}

/// Read a mapping written by `save_tags`
pub fn load_tags<P: AsRef<Path>>(path: P) -> Result<MoodTagMapping> {
    let path = path.as_ref();
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read mood tags {:?}", path))?;
    let mapping: MoodTagMapping = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse mood tags {:?}", path))?;
    log::info!("[Tags] Loaded {} tags from {:?}", mapping.len(), path);
    Ok(mapping)
}
