//! Plan operation - describe the registered tasks.

use std::collections::HashSet;

use clap::ValueEnum;
use eyre::{Context, Result};
use flare_templates_codegen::TaskGraph;
use flare_templates_manifest::ManifestFile;

use crate::reports::{PlanReport, PlannedTask};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    /// Human-readable summary
    Text,
    /// Task descriptors as JSON
    Json,
    /// `cargo:rerun-if-changed` directives for a build script
    Cargo,
}

pub fn plan(file: &ManifestFile, graph: &TaskGraph, format: PlanFormat) -> Result<PlanReport> {
    Ok(match format {
        PlanFormat::Text => PlanReport::Text {
            root: file.project_root(),
            tasks: graph
                .tasks()
                .iter()
                .map(|task| PlannedTask {
                    descriptor: task.descriptor().clone(),
                    outputs: task.expected_outputs(),
                })
                .collect(),
            aggregate: graph.aggregate().clone(),
        },
        PlanFormat::Json => PlanReport::Json(
            serde_json::to_string_pretty(graph).wrap_err("Failed to serialize task graph")?,
        ),
        PlanFormat::Cargo => {
            let mut seen = HashSet::new();
            PlanReport::Cargo(
                graph
                    .tasks()
                    .iter()
                    .flat_map(|task| task.descriptor().cargo_directives())
                    .filter(|directive| seen.insert(directive.clone()))
                    .collect(),
            )
        }
    })
}
