//! Check operation - validate configuration and templates.

use flare_templates_codegen::{GenerateError, Result, RunOptions, TaskGraph};
use flare_templates_manifest::ManifestFile;

use crate::reports::CheckReport;

/// Render every pair of every task without writing, collecting failures.
///
/// Configuration problems (unknown variants, malformed data) have already
/// surfaced while building `graph`; this catches template-level failures.
pub fn check(file: &ManifestFile, graph: &TaskGraph) -> Result<CheckReport> {
    let mut failures = Vec::new();
    let mut warnings = Vec::new();
    let mut pair_count = 0;

    for task in graph.tasks() {
        for set in task.template_sets() {
            if set.templates().is_empty() {
                warnings.push(format!(
                    "template set '{}' has no templates in {}",
                    set.name(),
                    set.template_dir().display()
                ));
            }
        }

        let options = RunOptions {
            force: true,
            dry_run: true,
        };
        match task.run(options) {
            Ok(report) => pair_count += report.files.len(),
            Err(GenerateError::GenerationFailed { failures: f, .. }) => failures.extend(f),
            Err(e) => return Err(e),
        }
    }

    Ok(CheckReport {
        config_path: file.path().to_path_buf(),
        task_count: graph.tasks().len(),
        template_set_count: file.manifest().template_set_count(),
        pair_count,
        warnings,
        failures,
    })
}
