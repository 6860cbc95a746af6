//! The per-source-set generation task.
//!
//! A run goes through fixed phases:
//!
//! 1. compare the declared inputs against the last successful run and skip
//!    the whole task when nothing changed, clearing only stray files
//! 2. plan every (template, variant) pair, detecting output collisions
//! 3. skip pairs whose fingerprint and output are unchanged, unless forced
//! 4. render the remaining pairs in parallel
//! 5. write outputs atomically, but only if every pair rendered
//! 6. remove outputs that are no longer produced, then commit the new state

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    path::{Path, PathBuf},
};

use flare_templates_core::{
    ContentHash, Fingerprint, OutputFile, WriteResult, list_files, remove_empty_dirs,
};
use flare_templates_manifest::{Value, VariantRow};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    FailureKind, GENERATOR_VERSION, GenerateError, PairFailure, Result, TaskDescriptor,
    TemplateSet, naming,
    render::{RenderError, Template},
    state::{IncrementalState, StateEntry},
    template_set::{Header, ResolvedVariant, TemplateSource},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Ignore recorded state and regenerate every pair
    pub force: bool,
    /// Render and report without touching the filesystem
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Rendered and written (or would be, in a dry run)
    Rendered,
    /// Rendered, but the file on disk already held the same bytes
    Unchanged,
    /// Skipped because nothing it depends on changed
    UpToDate,
}

/// One output of a (template, variant) pair.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedFile {
    pub template_set: String,
    pub template: String,
    pub template_hash: ContentHash,
    pub variant: String,
    pub row: VariantRow,
    pub output: PathBuf,
    pub fingerprint: ContentHash,
    pub content_hash: ContentHash,
    pub status: FileStatus,
    /// Rendered content, kept only for dry runs
    #[serde(skip)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    UpToDate,
    Executed,
    DryRun,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task: String,
    pub outcome: TaskOutcome,
    pub files: Vec<GeneratedFile>,
    /// Stale outputs removed (or that would be, in a dry run)
    pub removed: Vec<PathBuf>,
}

impl TaskReport {
    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }
}

/// Generates every template set of one source set.
#[derive(Debug, Clone)]
pub struct GenerationTask {
    descriptor: TaskDescriptor,
    template_sets: Vec<TemplateSet>,
}

impl GenerationTask {
    pub fn new(descriptor: TaskDescriptor, template_sets: Vec<TemplateSet>) -> Self {
        Self {
            descriptor,
            template_sets,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &TaskDescriptor {
        &self.descriptor
    }

    pub fn template_sets(&self) -> &[TemplateSet] {
        &self.template_sets
    }

    /// Output paths this task produces, in plan order.
    pub fn expected_outputs(&self) -> Vec<PathBuf> {
        let mut outputs = Vec::new();
        for set in &self.template_sets {
            for source in set.templates() {
                for variant in set.resolved_variants() {
                    let relative = set.relative_output(source, variant.id());
                    outputs.push(set.output_dir().join(relative));
                }
            }
        }
        outputs
    }

    pub fn run(&self, options: RunOptions) -> Result<TaskReport> {
        let state_file = &self.descriptor.state_file;
        // Loaded even when forced: it is what tells us which outputs to prune.
        let previous = IncrementalState::load(state_file);
        // A template that vanished since configuration is reported per pair below.
        let inputs = match self.descriptor.inputs.fingerprint() {
            Ok(inputs) => Some(inputs),
            Err(e) => {
                debug!(task = %self.name(), error = %e, "declared inputs unreadable");
                None
            }
        };

        if !options.force
            && !options.dry_run
            && let Some(inputs) = &inputs
            && previous.is_task_up_to_date(inputs)
            && let Some(files) = self.recorded_files(&previous)
        {
            let expected: HashSet<&Path> = files.iter().map(|f| f.output.as_path()).collect();
            let strays = self.stale_outputs(&previous, &expected)?;
            let removed = self.remove_outputs(strays)?;
            info!(
                task = %self.name(),
                files = files.len(),
                removed = removed.len(),
                "up to date"
            );
            return Ok(self.report(TaskOutcome::UpToDate, files, removed));
        }

        let templates = self.load_templates();
        let mut failures = Vec::new();
        let jobs = plan(&templates, &mut failures);

        let (fresh, pending): (Vec<&Job<'_>>, Vec<&Job<'_>>) = jobs.iter().partition(|job| {
            !options.force && previous.is_fresh(&job.key, &job.fingerprint, &job.output)
        });
        debug!(
            task = %self.name(),
            fresh = fresh.len(),
            pending = pending.len(),
            "planned pairs"
        );

        let rendered: Vec<std::result::Result<String, PairFailure>> =
            pending.par_iter().map(|job| job.render()).collect();

        let mut outputs = Vec::with_capacity(pending.len());
        for (job, result) in pending.iter().zip(rendered) {
            match result {
                Ok(content) => outputs.push((*job, content)),
                Err(failure) => failures.push(failure),
            }
        }
        if !failures.is_empty() {
            return Err(self.failed(failures));
        }

        let expected: HashSet<&Path> = jobs.iter().map(|job| job.output.as_path()).collect();
        let stale = self.stale_outputs(&previous, &expected)?;

        if options.dry_run {
            let mut files: Vec<GeneratedFile> = fresh
                .iter()
                .filter_map(|job| {
                    let entry = previous.get(&job.key)?;
                    Some(job.file(FileStatus::UpToDate, entry.content_hash.clone(), None))
                })
                .collect();
            files.extend(outputs.into_iter().map(|(job, content)| {
                let hash = ContentHash::from_bytes(content.as_bytes());
                job.file(FileStatus::Rendered, hash, Some(content))
            }));
            return Ok(self.report(TaskOutcome::DryRun, files, stale.into_iter().collect()));
        }

        let mut next = IncrementalState::new();
        let mut files = Vec::with_capacity(jobs.len());

        for job in &fresh {
            if let Some(entry) = previous.get(&job.key) {
                files.push(job.file(FileStatus::UpToDate, entry.content_hash.clone(), None));
                next.insert(entry.clone());
            }
        }

        for (job, content) in outputs {
            let file = OutputFile::new(&job.output, content);
            let status = match file.write() {
                Ok(WriteResult::Written) => FileStatus::Rendered,
                Ok(WriteResult::Unchanged) => FileStatus::Unchanged,
                Err(e) => {
                    failures.push(job.failure(
                        FailureKind::Io,
                        format!("failed to write '{}': {}", job.output.display(), e),
                    ));
                    continue;
                }
            };
            let hash = file.content_hash();
            debug!(
                output = %job.output.display(),
                ?status,
                hash = hash.short(),
                "wrote output"
            );
            next.insert(job.entry(hash.clone()));
            files.push(job.file(status, hash, None));
        }

        if !failures.is_empty() {
            // Keep what was written so the next run can skip it, and what was
            // not pruned so the next run still can.
            next.carry_forward(&previous);
            next.save(state_file)
                .map_err(|e| GenerateError::io(state_file, e))?;
            return Err(self.failed(failures));
        }

        let removed = self.remove_outputs(stale)?;
        next.task_inputs = inputs;
        next.save(state_file)
            .map_err(|e| GenerateError::io(state_file, e))?;

        let report = self.report(TaskOutcome::Executed, files, removed);
        info!(
            task = %self.name(),
            rendered = report.count(FileStatus::Rendered),
            unchanged = report.count(FileStatus::Unchanged),
            up_to_date = report.count(FileStatus::UpToDate),
            removed = report.removed.len(),
            "generated"
        );
        Ok(report)
    }

    /// Delete everything this task generated, along with its state.
    ///
    /// Returns the removed (or, for a dry run, removable) files.
    pub fn clean(&self, dry_run: bool) -> Result<Vec<PathBuf>> {
        let state_file = &self.descriptor.state_file;
        let state = IncrementalState::load(state_file);
        let outputs = self.stale_outputs(&state, &HashSet::new())?;

        if dry_run {
            return Ok(outputs.into_iter().collect());
        }

        let removed = self.remove_outputs(outputs)?;
        match std::fs::remove_file(state_file) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(GenerateError::io(state_file, e)),
        }
        info!(task = %self.name(), removed = removed.len(), "cleaned");
        Ok(removed)
    }

    fn load_templates(&self) -> Vec<LoadedTemplate<'_>> {
        let mut templates = Vec::new();
        for set in &self.template_sets {
            for source in set.templates() {
                let body = match std::fs::read_to_string(source.path()) {
                    Ok(content) => Template::parse(&content)
                        .map(|template| TemplateBody {
                            template,
                            hash: ContentHash::from_bytes(content.as_bytes()),
                        })
                        .map_err(TemplateProblem::Syntax),
                    Err(e) => Err(TemplateProblem::Unreadable(format!(
                        "failed to read '{}': {}",
                        source.path().display(),
                        e
                    ))),
                };
                templates.push(LoadedTemplate {
                    set,
                    source,
                    name: source.display_name(),
                    body,
                });
            }
        }
        templates
    }

    /// Files recorded by the last run, in plan order. `None` when the state
    /// does not account for exactly the current pairs.
    fn recorded_files(&self, state: &IncrementalState) -> Option<Vec<GeneratedFile>> {
        let mut files = Vec::new();
        for set in &self.template_sets {
            for source in set.templates() {
                let name = source.display_name();
                for variant in set.resolved_variants() {
                    let key = IncrementalState::key(set.name(), &name, variant.id());
                    let entry = state.get(&key)?;
                    files.push(GeneratedFile {
                        template_set: set.name().to_string(),
                        template: name.clone(),
                        template_hash: entry.template_hash.clone(),
                        variant: variant.id().to_string(),
                        row: variant.row().clone(),
                        output: entry.output.clone(),
                        fingerprint: entry.fingerprint.clone(),
                        content_hash: entry.content_hash.clone(),
                        status: FileStatus::UpToDate,
                        content: None,
                    });
                }
            }
        }
        (files.len() == state.len()).then_some(files)
    }

    /// Outputs on disk that are not in `expected`: recorded outputs of
    /// earlier runs plus anything else inside an owned output directory.
    fn stale_outputs(
        &self,
        previous: &IncrementalState,
        expected: &HashSet<&Path>,
    ) -> Result<BTreeSet<PathBuf>> {
        let mut stale: BTreeSet<PathBuf> = previous
            .outputs()
            .filter(|output| !expected.contains(output) && output.exists())
            .map(Path::to_path_buf)
            .collect();

        for set in self.template_sets.iter().filter(|s| s.owns_output_dir()) {
            let files =
                list_files(set.output_dir()).map_err(|e| GenerateError::io(set.output_dir(), e))?;
            stale.extend(
                files
                    .into_iter()
                    .filter(|file| !expected.contains(file.as_path())),
            );
        }
        Ok(stale)
    }

    fn remove_outputs(&self, outputs: BTreeSet<PathBuf>) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::with_capacity(outputs.len());
        for path in outputs {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "removed stale output");
                    removed.push(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(GenerateError::io(&path, e)),
            }
        }

        for set in self.template_sets.iter().filter(|s| s.owns_output_dir()) {
            remove_empty_dirs(set.output_dir(), set.output_dir())
                .map_err(|e| GenerateError::io(set.output_dir(), e))?;
        }
        Ok(removed)
    }

    fn report(
        &self,
        outcome: TaskOutcome,
        files: Vec<GeneratedFile>,
        removed: Vec<PathBuf>,
    ) -> TaskReport {
        TaskReport {
            task: self.name().to_string(),
            outcome,
            files,
            removed,
        }
    }

    fn failed(&self, mut failures: Vec<PairFailure>) -> GenerateError {
        failures.sort_by(|a, b| {
            (&a.template_set, &a.template, &a.variant).cmp(&(
                &b.template_set,
                &b.template,
                &b.variant,
            ))
        });
        GenerateError::GenerationFailed {
            task: self.name().to_string(),
            failures,
        }
    }
}

struct LoadedTemplate<'a> {
    set: &'a TemplateSet,
    source: &'a TemplateSource,
    name: String,
    body: std::result::Result<TemplateBody, TemplateProblem>,
}

struct TemplateBody {
    template: Template,
    hash: ContentHash,
}

enum TemplateProblem {
    Syntax(RenderError),
    Unreadable(String),
}

/// A (template, variant) pair cleared for rendering.
struct Job<'a> {
    template: &'a LoadedTemplate<'a>,
    body: &'a TemplateBody,
    variant: &'a ResolvedVariant,
    relative: PathBuf,
    output: PathBuf,
    key: String,
    fingerprint: ContentHash,
}

/// Expand templates × variants, reporting collisions and unparsable templates.
fn plan<'a>(
    templates: &'a [LoadedTemplate<'a>],
    failures: &mut Vec<PairFailure>,
) -> Vec<Job<'a>> {
    let mut jobs = Vec::new();
    let mut claimed: HashMap<PathBuf, String> = HashMap::new();

    for template in templates {
        let set = template.set;
        for variant in set.resolved_variants() {
            let relative = set.relative_output(template.source, variant.id());
            let output = set.output_dir().join(&relative);
            let owner = format!("{}/{} [{}]", set.name(), template.name, variant.id());

            if let Some(existing) = claimed.get(&output) {
                failures.push(PairFailure::new(
                    set.name(),
                    &template.name,
                    variant.id(),
                    FailureKind::OutputCollision,
                    format!("output '{}' is also produced by {}", output.display(), existing),
                ));
                continue;
            }
            claimed.insert(output.clone(), owner);

            let body = match &template.body {
                Ok(body) => body,
                Err(TemplateProblem::Syntax(e)) => {
                    failures.push(PairFailure::render(set.name(), &template.name, variant.id(), e));
                    continue;
                }
                Err(TemplateProblem::Unreadable(message)) => {
                    failures.push(PairFailure::new(
                        set.name(),
                        &template.name,
                        variant.id(),
                        FailureKind::Io,
                        message.clone(),
                    ));
                    continue;
                }
            };

            jobs.push(Job {
                template,
                body,
                variant,
                key: IncrementalState::key(set.name(), &template.name, variant.id()),
                fingerprint: pair_fingerprint(template, body, variant, &relative),
                relative,
                output,
            });
        }
    }
    jobs
}

/// Everything that can change a pair's output.
fn pair_fingerprint(
    template: &LoadedTemplate<'_>,
    body: &TemplateBody,
    variant: &ResolvedVariant,
    relative: &Path,
) -> ContentHash {
    let set = template.set;
    Fingerprint::new()
        .field("generator", GENERATOR_VERSION)
        .field("source_set", set.source_set())
        .field("template_set", set.name())
        .field("template", &template.name)
        .field("template_hash", body.hash.as_str())
        .field("row", variant.row().canonical())
        .field("header", set.header().map(Header::text).unwrap_or_default())
        .field("output", relative.to_string_lossy().as_bytes())
        .finish()
}

impl Job<'_> {
    fn render(&self) -> std::result::Result<String, PairFailure> {
        let set = self.template.set;

        let mut globals = IndexMap::new();
        globals.insert("template_set".to_string(), Value::from(set.name()));
        globals.insert("source_set".to_string(), Value::from(set.source_set()));
        globals.insert(
            "type_name".to_string(),
            Value::Text(naming::type_name(&self.relative)),
        );

        let body = self
            .body
            .template
            .render_with(self.variant.row(), &globals)
            .map_err(|e| {
                PairFailure::render(set.name(), &self.template.name, self.variant.id(), &e)
            })?;

        Ok(match set.header() {
            Some(header) => format!("{}{}", header.text(), body),
            None => body,
        })
    }

    fn failure(&self, kind: FailureKind, message: impl Into<String>) -> PairFailure {
        PairFailure::new(
            self.template.set.name(),
            &self.template.name,
            self.variant.id(),
            kind,
            message,
        )
    }

    fn entry(&self, content_hash: ContentHash) -> StateEntry {
        StateEntry {
            template_set: self.template.set.name().to_string(),
            template: self.template.name.clone(),
            variant: self.variant.id().to_string(),
            template_hash: self.body.hash.clone(),
            fingerprint: self.fingerprint.clone(),
            output: self.output.clone(),
            content_hash,
        }
    }

    fn file(
        &self,
        status: FileStatus,
        content_hash: ContentHash,
        content: Option<String>,
    ) -> GeneratedFile {
        GeneratedFile {
            template_set: self.template.set.name().to_string(),
            template: self.template.name.clone(),
            template_hash: self.body.hash.clone(),
            variant: self.variant.id().to_string(),
            row: self.variant.row().clone(),
            output: self.output.clone(),
            fingerprint: self.fingerprint.clone(),
            content_hash,
            status,
            content,
        }
    }
}
