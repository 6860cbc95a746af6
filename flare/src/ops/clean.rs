//! Clean operation - remove generated sources.

use flare_templates_codegen::{GenerationTask, Result, TaskGraph};
use flare_templates_manifest::ManifestFile;

use crate::reports::CleanReport;

/// Clean `tasks`, along with outputs no configured task owns any more.
pub fn clean(
    file: &ManifestFile,
    graph: &TaskGraph,
    tasks: &[&GenerationTask],
    dry_run: bool,
) -> Result<CleanReport> {
    let mut removed = Vec::new();
    for task in tasks {
        removed.extend(task.clean(dry_run)?);
    }
    removed.extend(graph.prune_orphans(dry_run)?);

    Ok(CleanReport {
        root: file.project_root(),
        dry_run,
        removed,
    })
}
