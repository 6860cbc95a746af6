//! What a generation task declares to the surrounding build.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use flare_templates_core::{ContentHash, Fingerprint};
use serde::Serialize;

use crate::{GENERATOR_VERSION, GenerateError, Result, TemplateSet};

/// Group every generation task is registered under.
pub const GENERATION_GROUP: &str = "generation";

/// Files and settings whose change makes a task stale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskInputs {
    pub templates: Vec<PathBuf>,
    pub data_files: Vec<PathBuf>,
    pub headers: Vec<PathBuf>,
    /// Configuration values that affect output, keyed `<template set>.<setting>`
    pub properties: BTreeMap<String, String>,
}

impl TaskInputs {
    /// Record a resolved template set's inputs.
    pub fn add_template_set(&mut self, set: &TemplateSet) {
        self.templates
            .extend(set.templates().iter().map(|t| t.path().to_path_buf()));
        for data_file in set.data_files() {
            if !self.data_files.contains(data_file) {
                self.data_files.push(data_file.clone());
            }
        }
        if let Some(header) = set.header()
            && !self.headers.iter().any(|h| h == header.path())
        {
            self.headers.push(header.path().to_path_buf());
        }

        let ids: Vec<&str> = set.resolved_variants().iter().map(|v| v.id()).collect();
        let mut property = |key: &str, value: String| {
            self.properties
                .insert(format!("{}.{}", set.name(), key), value);
        };
        property("variants", ids.join(","));
        property("output_dir", set.output_dir().display().to_string());
        property("name_token", set.name_token().to_string());
        property("template_suffix", set.template_suffix().to_string());
    }

    /// Every declared input file, in declaration order.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.templates
            .iter()
            .chain(&self.data_files)
            .chain(&self.headers)
            .map(PathBuf::as_path)
    }

    /// Hash of every input file's path and content plus the properties.
    pub fn fingerprint(&self) -> Result<ContentHash> {
        let mut fingerprint = Fingerprint::new().field("generator", GENERATOR_VERSION);
        for path in self.files() {
            let content = std::fs::read(path).map_err(|e| GenerateError::io(path, e))?;
            fingerprint.push("path", path.to_string_lossy().as_bytes());
            fingerprint.push("content", &content);
        }
        for (key, value) in &self.properties {
            fingerprint.push(key, value.as_bytes());
        }
        Ok(fingerprint.finish())
    }
}

/// A generation task as registered with the host build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDescriptor {
    pub name: String,
    pub group: String,
    pub description: String,
    pub source_set: String,
    pub inputs: TaskInputs,
    /// Output directories, one per template set
    pub outputs: Vec<PathBuf>,
    pub state_file: PathBuf,
    /// Steps that consume generated sources and must run after this task
    pub must_run_before: Vec<String>,
    /// Steps that always follow this task, such as header formatting
    pub finalized_by: Vec<String>,
}

impl TaskDescriptor {
    /// `cargo:` directives for a build script driving this task.
    pub fn cargo_directives(&self) -> Vec<String> {
        self.inputs
            .files()
            .map(|path| format!("cargo:rerun-if-changed={}", path.display()))
            .collect()
    }
}

/// The task that depends on every per-source-set generation task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateTask {
    pub name: String,
    pub group: String,
    pub depends_on: Vec<String>,
}
