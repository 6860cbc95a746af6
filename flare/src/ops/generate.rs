//! Generate operation - run generation tasks.

use flare_templates_codegen::{GenerationTask, Result, RunOptions, TaskGraph};
use flare_templates_manifest::ManifestFile;
use tracing::debug;

use crate::reports::GenerateReport;

/// Run each task in order, stopping at the first failure, then prune what
/// source sets and template sets no longer configured left behind.
pub fn generate(
    file: &ManifestFile,
    graph: &TaskGraph,
    tasks: &[&GenerationTask],
    options: RunOptions,
) -> Result<GenerateReport> {
    let mut reports = Vec::with_capacity(tasks.len());
    for task in tasks {
        debug!(
            task = task.name(),
            force = options.force,
            dry_run = options.dry_run,
            "running task"
        );
        reports.push(task.run(options)?);
    }
    let orphans = graph.prune_orphans(options.dry_run)?;

    Ok(GenerateReport {
        root: file.project_root(),
        dry_run: options.dry_run,
        tasks: reports,
        orphans,
    })
}
