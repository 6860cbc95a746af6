//! Registers generation tasks for every source set that declares template sets.
//!
//! Conventions, relative to the project root:
//!
//! - templates: `src/<source set>/template/<template set>`
//! - outputs: `<build>/generated/sources/<source set>-templates/<template set>`
//! - state: `<build>/tmp/<task>/state.json`
//!
//! Task names follow the source set: `generateTemplates` for `main`,
//! `generate<Set>Templates` otherwise. `generateAllTemplates` depends on all of
//! them.
//!
//! Removing a source set or template set from the configuration leaves its
//! outputs behind with no task to prune them; [`TaskGraph::prune_orphans`]
//! deletes those.

use std::{
    collections::{BTreeSet, HashSet},
    path::{Path, PathBuf},
};

use flare_templates_core::{list_files, remove_empty_dirs, to_pascal_case};
use flare_templates_manifest::{ManifestFile, VariantTableCache};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    AggregateTask, GENERATION_GROUP, GenerateError, GenerationTask, IncrementalState, Result,
    TaskDescriptor, TaskInputs, TemplateSet, TemplateSetLayout,
};

/// Name of the task depending on every generation task.
pub const AGGREGATE_TASK: &str = "generateAllTemplates";

/// Source set whose tasks carry no source set name.
pub const MAIN_SOURCE_SET: &str = "main";

/// Task name for `verb` + `target` in a source set, e.g. `compileTestJava`.
pub fn task_name(verb: &str, target: &str, source_set: &str) -> String {
    if source_set == MAIN_SOURCE_SET {
        format!("{}{}", verb, to_pascal_case(target))
    } else {
        format!("{}{}{}", verb, to_pascal_case(source_set), to_pascal_case(target))
    }
}

pub fn default_template_dir(root: &Path, source_set: &str, template_set: &str) -> PathBuf {
    root.join("src")
        .join(source_set)
        .join("template")
        .join(template_set)
}

pub fn default_output_dir(build_dir: &Path, source_set: &str, template_set: &str) -> PathBuf {
    generated_root(build_dir)
        .join(format!("{}-templates", source_set))
        .join(template_set)
}

/// Generated-source root; output directories below it belong to the generator.
pub fn generated_root(build_dir: &Path) -> PathBuf {
    build_dir.join("generated").join("sources")
}

pub fn state_file(build_dir: &Path, task: &str) -> PathBuf {
    build_dir.join("tmp").join(task).join("state.json")
}

/// Whether `name` is one of ours, as produced by [`task_name`].
fn is_generation_task(name: &str) -> bool {
    name != AGGREGATE_TASK && name.starts_with("generate") && name.ends_with("Templates")
}

/// Subdirectories of `dir` whose name satisfies `keep`.
fn subdirs(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(GenerateError::io(dir, e)),
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| GenerateError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() && entry.file_name().to_str().is_some_and(&keep) {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Every registered task, plus the aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct TaskGraph {
    #[serde(serialize_with = "serialize_descriptors")]
    tasks: Vec<GenerationTask>,
    aggregate: AggregateTask,
    #[serde(skip)]
    build_dir: PathBuf,
}

fn serialize_descriptors<S: serde::Serializer>(
    tasks: &[GenerationTask],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(tasks.iter().map(GenerationTask::descriptor))
}

impl TaskGraph {
    pub fn tasks(&self) -> &[GenerationTask] {
        &self.tasks
    }

    pub fn task(&self, name: &str) -> Option<&GenerationTask> {
        self.tasks.iter().find(|t| t.name() == name)
    }

    pub fn for_source_set(&self, source_set: &str) -> Option<&GenerationTask> {
        self.tasks
            .iter()
            .find(|t| t.descriptor().source_set == source_set)
    }

    pub fn aggregate(&self) -> &AggregateTask {
        &self.aggregate
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Delete what unregistered tasks left behind: the outputs recorded in
    /// their state files, the state files themselves, and every file in a
    /// `<set>-templates` directory that no configured template set writes to.
    ///
    /// Returns the removed (or, for a dry run, removable) files.
    pub fn prune_orphans(&self, dry_run: bool) -> Result<Vec<PathBuf>> {
        let claimed: HashSet<PathBuf> = self
            .tasks
            .iter()
            .flat_map(GenerationTask::expected_outputs)
            .collect();
        let owned: Vec<&Path> = self
            .tasks
            .iter()
            .flat_map(GenerationTask::template_sets)
            .map(TemplateSet::output_dir)
            .collect();

        let tmp = self.build_dir.join("tmp");
        let mut orphans = BTreeSet::new();
        let mut states = Vec::new();
        for dir in subdirs(&tmp, is_generation_task)? {
            let registered = dir
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| self.task(n).is_some());
            let path = dir.join("state.json");
            if registered || !path.exists() {
                continue;
            }
            let state = IncrementalState::load(&path);
            orphans.extend(
                state
                    .outputs()
                    .filter(|output| !claimed.contains(*output) && output.exists())
                    .map(Path::to_path_buf),
            );
            states.push(path);
        }

        let generated = generated_root(&self.build_dir);
        let template_dirs = subdirs(&generated, |n| n.ends_with("-templates"))?;
        for dir in &template_dirs {
            let files = list_files(dir).map_err(|e| GenerateError::io(dir, e))?;
            orphans.extend(files.into_iter().filter(|file| {
                !claimed.contains(file) && !owned.iter().any(|o| file.starts_with(o))
            }));
        }

        if dry_run {
            return Ok(orphans.into_iter().collect());
        }

        let mut removed = Vec::with_capacity(orphans.len());
        for path in orphans {
            match std::fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(GenerateError::io(&path, e)),
            }
        }
        for path in &states {
            std::fs::remove_file(path).map_err(|e| GenerateError::io(path, e))?;
            if let Some(dir) = path.parent() {
                remove_empty_dirs(dir, &tmp).map_err(|e| GenerateError::io(dir, e))?;
            }
        }
        for dir in &template_dirs {
            remove_empty_dirs(dir, &generated).map_err(|e| GenerateError::io(dir, e))?;
        }

        if !removed.is_empty() || !states.is_empty() {
            info!(removed = removed.len(), states = states.len(), "pruned orphaned outputs");
        }
        Ok(removed)
    }
}

/// Turns a configuration file into a [`TaskGraph`].
pub struct TemplatesPlugin;

impl TemplatesPlugin {
    pub fn apply(project: &ManifestFile) -> Result<TaskGraph> {
        let mut cache = VariantTableCache::new();
        Self::apply_with_cache(project, &mut cache)
    }

    /// Like [`TemplatesPlugin::apply`], sharing parsed variant tables through `cache`.
    pub fn apply_with_cache(
        project: &ManifestFile,
        cache: &mut VariantTableCache,
    ) -> Result<TaskGraph> {
        let manifest = project.manifest();
        let root = project.project_root();
        let build_dir = project.build_dir();
        let owned_root = generated_root(&build_dir);

        let mut tasks = Vec::new();
        for (source_set, config) in &manifest.source_sets {
            if config.template_sets.is_empty() {
                continue;
            }

            let name = task_name("generate", "Templates", source_set);
            let mut inputs = TaskInputs::default();
            let mut outputs = Vec::new();
            let mut template_sets = Vec::new();

            for (set_name, set_config) in &config.template_sets {
                let template_dir = match &set_config.template_dir {
                    Some(dir) => project.resolve(dir),
                    None => default_template_dir(&root, source_set, set_name),
                };
                let output_dir = match &set_config.output_dir {
                    Some(dir) => project.resolve(dir),
                    None => default_output_dir(&build_dir, source_set, set_name),
                };
                let header = set_config
                    .header
                    .as_ref()
                    .or(manifest.project.header.as_ref())
                    .map(|h| project.resolve(h));

                let owns_output_dir =
                    output_dir.starts_with(&owned_root) && output_dir != owned_root;

                let layout = TemplateSetLayout {
                    source_set: source_set.clone(),
                    name: set_name.clone(),
                    template_dir,
                    output_dir,
                    owns_output_dir,
                    data_files: set_config
                        .data_files
                        .iter()
                        .map(|f| project.resolve(f))
                        .collect(),
                    header,
                };

                let set = TemplateSet::resolve(layout, set_config, cache)?;
                inputs.add_template_set(&set);
                outputs.push(set.output_dir().to_path_buf());
                template_sets.push(set);
            }

            let compile_step = config
                .compile_step
                .clone()
                .unwrap_or_else(|| task_name("compile", "Java", source_set));
            let format_step = config
                .format_step
                .clone()
                .or_else(|| manifest.project.format_step.clone());

            let descriptor = TaskDescriptor {
                description: format!("Generates {} sources from templates", source_set),
                group: GENERATION_GROUP.to_string(),
                source_set: source_set.clone(),
                state_file: state_file(&build_dir, &name),
                inputs,
                outputs,
                must_run_before: vec![compile_step],
                finalized_by: format_step.into_iter().collect(),
                name,
            };
            debug!(task = %descriptor.name, template_sets = template_sets.len(), "registered task");
            tasks.push(GenerationTask::new(descriptor, template_sets));
        }

        let aggregate = AggregateTask {
            name: AGGREGATE_TASK.to_string(),
            group: GENERATION_GROUP.to_string(),
            depends_on: tasks.iter().map(|t| t.name().to_string()).collect(),
        };

        Ok(TaskGraph {
            tasks,
            aggregate,
            build_dir,
        })
    }
}
