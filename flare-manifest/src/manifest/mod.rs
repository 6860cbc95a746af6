//! Manifest types and parsing for flare-templates.toml files.

mod file;
mod parse;
mod validate;

use std::path::PathBuf;

pub use file::ManifestFile;
use indexmap::IndexMap;
use serde::Deserialize;
pub use validate::ParseContext;

/// Default name of the configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "flare-templates.toml";

/// Root manifest for flare-templates.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Project-wide settings
    #[serde(default)]
    pub project: ProjectConfig,

    /// Source sets in declaration order (e.g. `main`, `test`)
    #[serde(default)]
    pub source_sets: IndexMap<String, SourceSetConfig>,
}

/// The `[project]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Project root, relative to the configuration file
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Build directory, relative to the project root
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    /// Header file prepended to every generated file unless a template set overrides it
    #[serde(default)]
    pub header: Option<PathBuf>,

    /// External formatting step that must run after generation
    #[serde(default)]
    pub format_step: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            build_dir: default_build_dir(),
            header: None,
            format_step: None,
        }
    }
}

/// A `[source_sets.<name>]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSetConfig {
    /// Compile step that consumes the generated sources
    #[serde(default)]
    pub compile_step: Option<String>,

    /// Overrides the project's format step for this source set
    #[serde(default)]
    pub format_step: Option<String>,

    /// Template sets in declaration order
    #[serde(default)]
    pub template_sets: IndexMap<String, TemplateSetConfig>,
}

/// A `[source_sets.<set>.template_sets.<name>]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateSetConfig {
    /// YAML variant tables, relative to the project root
    pub data_files: Vec<PathBuf>,

    /// Variant ids to generate, in output order
    pub variants: Vec<String>,

    /// Directory holding the templates (default `src/<set>/template/<name>`)
    #[serde(default)]
    pub template_dir: Option<PathBuf>,

    /// Explicit template list relative to the template directory.
    /// Every file in the template directory is used when absent.
    #[serde(default)]
    pub templates: Option<Vec<PathBuf>>,

    /// Output directory (default `<build>/generated/sources/<set>-templates/<name>`)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Header file overriding the project header
    #[serde(default)]
    pub header: Option<PathBuf>,

    /// File-name fragment replaced by the PascalCase variant id
    #[serde(default = "default_name_token")]
    pub name_token: String,

    /// Suffix stripped from template file names
    #[serde(default = "default_template_suffix")]
    pub template_suffix: String,
}

impl Default for TemplateSetConfig {
    fn default() -> Self {
        Self {
            data_files: Vec::new(),
            variants: Vec::new(),
            template_dir: None,
            templates: None,
            output_dir: None,
            header: None,
            name_token: default_name_token(),
            template_suffix: default_template_suffix(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_name_token() -> String {
    "Variant".to_string()
}

fn default_template_suffix() -> String {
    "tmpl".to_string()
}

impl Manifest {
    /// Iterate over every `(source set, template set name, config)` triple in declaration order.
    pub fn template_sets(&self) -> impl Iterator<Item = (&str, &str, &TemplateSetConfig)> {
        self.source_sets.iter().flat_map(|(set, config)| {
            config
                .template_sets
                .iter()
                .map(move |(name, ts)| (set.as_str(), name.as_str(), ts))
        })
    }

    /// Total number of template sets across all source sets.
    pub fn template_set_count(&self) -> usize {
        self.source_sets
            .values()
            .map(|s| s.template_sets.len())
            .sum()
    }
}
