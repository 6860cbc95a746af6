//! Plan command report data structures.

use std::path::{Path, PathBuf};

use flare_templates_codegen::{AggregateTask, TaskDescriptor};

use super::{
    display_path,
    output::{Output, Report},
};

/// A registered task with the outputs it will produce.
#[derive(Debug)]
pub struct PlannedTask {
    pub descriptor: TaskDescriptor,
    pub outputs: Vec<PathBuf>,
}

#[derive(Debug)]
pub enum PlanReport {
    Text {
        root: PathBuf,
        tasks: Vec<PlannedTask>,
        aggregate: AggregateTask,
    },
    /// Pre-serialized task graph.
    Json(String),
    /// Build script directives.
    Cargo(Vec<String>),
}

impl Report for PlanReport {
    fn render(&self, out: &mut dyn Output) {
        match self {
            PlanReport::Text {
                root,
                tasks,
                aggregate,
            } => render_text(out, root, tasks, aggregate),
            PlanReport::Json(json) => out.preformatted(json),
            PlanReport::Cargo(directives) => {
                for directive in directives {
                    out.preformatted(directive);
                }
            }
        }
    }
}

fn render_text(
    out: &mut dyn Output,
    root: &Path,
    tasks: &[PlannedTask],
    aggregate: &AggregateTask,
) {
    if tasks.is_empty() {
        out.preformatted("No template sets configured.");
        return;
    }

    for task in tasks {
        let d = &task.descriptor;
        out.section(&d.name);
        out.key_value_indented("description", &d.description);
        out.key_value_indented("group", &d.group);
        out.key_value_indented("must run before", &d.must_run_before.join(", "));
        if !d.finalized_by.is_empty() {
            out.key_value_indented("finalized by", &d.finalized_by.join(", "));
        }
        out.key_value_indented("input files", &d.inputs.files().count().to_string());
        out.key_value_indented("state", &display_path(root, &d.state_file));
        for output in &task.outputs {
            out.added_item(&display_path(root, output));
        }
        out.newline();
    }

    out.section(&aggregate.name);
    out.key_value_indented("depends on", &aggregate.depends_on.join(", "));
}
