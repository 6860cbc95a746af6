//! Generate command report data structures.

use std::path::PathBuf;

use flare_templates_codegen::{FileStatus, TaskOutcome, TaskReport};

use super::{
    display_path,
    output::{Output, Report},
};

/// Report data from running generation tasks.
#[derive(Debug)]
pub struct GenerateReport {
    /// Project root, for shortening paths.
    pub root: PathBuf,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// One report per task, in run order.
    pub tasks: Vec<TaskReport>,
    /// Outputs of source sets and template sets no longer configured.
    pub orphans: Vec<PathBuf>,
}

impl Report for GenerateReport {
    fn render(&self, out: &mut dyn Output) {
        if self.tasks.is_empty() && self.orphans.is_empty() {
            out.preformatted("No template sets configured.");
            return;
        }

        for task in &self.tasks {
            match task.outcome {
                TaskOutcome::UpToDate => {
                    out.preformatted(&format!(
                        "{}: up to date ({} files)",
                        task.task,
                        task.files.len()
                    ));
                    for path in &task.removed {
                        out.removed_item(&display_path(&self.root, path));
                    }
                }
                TaskOutcome::Executed => self.render_executed(out, task),
                TaskOutcome::DryRun => self.render_preview(out, task),
            }
        }

        if !self.orphans.is_empty() {
            out.section(if self.dry_run {
                "No longer configured, would delete"
            } else {
                "No longer configured, deleted"
            });
            for path in &self.orphans {
                out.removed_item(&display_path(&self.root, path));
            }
        }

        if self.dry_run {
            out.newline();
            out.preformatted("Dry run: no files were written.");
        }
    }
}

impl GenerateReport {
    fn render_executed(&self, out: &mut dyn Output, task: &TaskReport) {
        out.section(&format!(
            "{} ({} rendered, {} unchanged, {} up to date)",
            task.task,
            task.count(FileStatus::Rendered),
            task.count(FileStatus::Unchanged),
            task.count(FileStatus::UpToDate)
        ));
        for file in task.files.iter().filter(|f| f.status == FileStatus::Rendered) {
            out.added_item(&display_path(&self.root, &file.output));
        }
        for path in &task.removed {
            out.removed_item(&display_path(&self.root, path));
        }
    }

    fn render_preview(&self, out: &mut dyn Output, task: &TaskReport) {
        for file in &task.files {
            if let Some(content) = &file.content {
                out.divider(&display_path(&self.root, &file.output));
                out.preformatted(content);
            }
        }

        out.divider(&format!("Summary: {}", task.task));
        out.preformatted(&format!(
            "{} files would be generated, {} up to date",
            task.count(FileStatus::Rendered),
            task.count(FileStatus::UpToDate)
        ));
        if !task.removed.is_empty() {
            out.section("Would delete");
            for path in &task.removed {
                out.removed_item(&display_path(&self.root, path));
            }
        }
    }
}
