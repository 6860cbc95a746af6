//! Template expansion and incremental generation tasks.
//!
//! # Module Organization
//!
//! - [`render`] - Placeholder syntax, parsing and expansion
//! - [`naming`] - Output file names derived from template names and variant ids
//! - [`TemplateSet`] - Templates joined with their resolved variant rows
//! - [`GenerationTask`] - Incremental, all-or-nothing generation for one source set
//! - [`TemplatesPlugin`] - Builds the [`TaskGraph`] from a configuration file

// Miette's derive macro generates code that triggers these warnings
#![allow(unused_assignments)]

mod descriptor;
mod error;
pub mod naming;
mod plugin;
pub mod render;
mod state;
mod task;
mod template_set;

pub use descriptor::{AggregateTask, GENERATION_GROUP, TaskDescriptor, TaskInputs};
pub use error::{FailureKind, GenerateError, PairFailure, Result};
pub use plugin::{
    AGGREGATE_TASK, MAIN_SOURCE_SET, TaskGraph, TemplatesPlugin, default_output_dir,
    default_template_dir, generated_root, state_file, task_name,
};
pub use render::{RenderError, Template, TemplateEngine};
pub use state::{IncrementalState, StateEntry};
pub use task::{FileStatus, GeneratedFile, GenerationTask, RunOptions, TaskOutcome, TaskReport};
pub use template_set::{Header, ResolvedVariant, TemplateSet, TemplateSetLayout, TemplateSource};

/// Version recorded in state files and mixed into every fingerprint.
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");
