//! Persisted record of what a generation task produced last time.
//!
//! The state is an optimization only: when it is missing, corrupt or written
//! by another generator version, everything is treated as stale and
//! regenerated.

use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

use flare_templates_core::{ContentHash, write_atomic};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::GENERATOR_VERSION;

/// Record of one generated output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub template_set: String,
    /// Template path relative to its template directory, `/`-separated
    pub template: String,
    pub variant: String,
    pub template_hash: ContentHash,
    pub fingerprint: ContentHash,
    pub output: PathBuf,
    pub content_hash: ContentHash,
}

impl StateEntry {
    pub fn key(&self) -> String {
        IncrementalState::key(&self.template_set, &self.template, &self.variant)
    }

    /// Whether the output on disk still holds exactly what was generated.
    pub fn output_intact(&self) -> bool {
        match std::fs::read(&self.output) {
            Ok(bytes) => ContentHash::from_bytes(&bytes) == self.content_hash,
            Err(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementalState {
    pub generator_version: String,
    /// Fingerprint of every declared task input at the last successful run
    #[serde(default)]
    pub task_inputs: Option<ContentHash>,
    #[serde(default)]
    pub entries: BTreeMap<String, StateEntry>,
}

impl Default for IncrementalState {
    fn default() -> Self {
        Self {
            generator_version: GENERATOR_VERSION.to_string(),
            task_inputs: None,
            entries: BTreeMap::new(),
        }
    }
}

impl IncrementalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load state from `path`, falling back to an empty state.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => {
                debug!(path = %path.display(), "no previous generation state");
                return Self::new();
            }
        };

        match serde_json::from_str::<Self>(&content) {
            Ok(state) if state.generator_version == GENERATOR_VERSION => state,
            Ok(state) => {
                debug!(
                    path = %path.display(),
                    found = %state.generator_version,
                    "discarding state from another generator version"
                );
                Self::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable generation state");
                Self::new()
            }
        }
    }

    /// Atomically write state to `path`.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        write_atomic(path, json.as_bytes())
    }

    pub fn key(template_set: &str, template: &str, variant: &str) -> String {
        format!("{}/{}#{}", template_set, template, variant)
    }

    pub fn get(&self, key: &str) -> Option<&StateEntry> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, entry: StateEntry) {
        self.entries.insert(entry.key(), entry);
    }

    /// Copy over every entry of `previous` this state has no entry for.
    pub fn carry_forward(&mut self, previous: &IncrementalState) {
        for (key, entry) in &previous.entries {
            self.entries
                .entry(key.clone())
                .or_insert_with(|| entry.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a pair with this fingerprint and output path can be skipped.
    pub fn is_fresh(&self, key: &str, fingerprint: &ContentHash, output: &Path) -> bool {
        self.get(key).is_some_and(|entry| {
            &entry.fingerprint == fingerprint && entry.output == output && entry.output_intact()
        })
    }

    /// Whether the whole task can be skipped for these declared inputs.
    pub fn is_task_up_to_date(&self, inputs: &ContentHash) -> bool {
        self.task_inputs.as_ref() == Some(inputs)
            && self.entries.values().all(StateEntry::output_intact)
    }

    /// Every output path this state accounts for.
    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.entries.values().map(|entry| entry.output.as_path())
    }
}
