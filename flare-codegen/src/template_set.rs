//! Resolved template sets: templates on disk joined with their variant rows.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use flare_templates_core::list_files;
use flare_templates_manifest::{TemplateSetConfig, VariantRow, VariantTableCache};
use tracing::{debug, warn};

use crate::{GenerateError, Result, naming};

/// A template file, addressed both absolutely and relative to its template directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    path: PathBuf,
    relative: PathBuf,
}

impl TemplateSource {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// Relative path with `/` separators, stable across platforms.
    pub fn display_name(&self) -> String {
        self.relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// A requested variant and the data file its row came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVariant {
    row: VariantRow,
    data_file: PathBuf,
}

impl ResolvedVariant {
    pub fn id(&self) -> &str {
        self.row.id()
    }

    pub fn row(&self) -> &VariantRow {
        &self.row
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }
}

/// Text prepended to every output of a template set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    path: PathBuf,
    text: String,
}

impl Header {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut text =
            std::fs::read_to_string(&path).map_err(|e| GenerateError::io(&path, e))?;
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        Ok(Self { path, text })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header text, newline-terminated unless empty.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Resolved locations for a template set. Every path is already absolute or
/// relative to the working directory.
#[derive(Debug, Clone)]
pub struct TemplateSetLayout {
    pub source_set: String,
    pub name: String,
    pub template_dir: PathBuf,
    pub output_dir: PathBuf,
    pub data_files: Vec<PathBuf>,
    pub header: Option<PathBuf>,
    /// Whether the output directory belongs exclusively to this template set.
    pub owns_output_dir: bool,
}

/// A named group of templates expanded over a chosen list of variants.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    source_set: String,
    name: String,
    template_dir: PathBuf,
    output_dir: PathBuf,
    owns_output_dir: bool,
    data_files: Vec<PathBuf>,
    templates: Vec<TemplateSource>,
    variants: Vec<ResolvedVariant>,
    header: Option<Header>,
    name_token: String,
    template_suffix: String,
}

impl TemplateSet {
    /// Load the data files, check every requested variant exists and locate
    /// the templates.
    ///
    /// Fails with `UnknownVariant` naming the first missing id, with
    /// `DuplicateVariant` when two data files define the same id, or with
    /// `MissingTemplates` when the template directory does not exist.
    pub fn resolve(
        layout: TemplateSetLayout,
        config: &TemplateSetConfig,
        cache: &mut VariantTableCache,
    ) -> Result<Self> {
        let mut rows: HashMap<String, ResolvedVariant> = HashMap::new();
        let mut available: Vec<String> = Vec::new();

        for data_file in &layout.data_files {
            let table = cache.load(data_file)?;
            for row in table.rows() {
                if let Some(existing) = rows.get(row.id()) {
                    return Err(GenerateError::DuplicateVariant {
                        template_set: layout.name.clone(),
                        variant: row.id().to_string(),
                        first: existing.data_file.clone(),
                        second: data_file.clone(),
                    });
                }
                available.push(row.id().to_string());
                rows.insert(
                    row.id().to_string(),
                    ResolvedVariant {
                        row: row.clone(),
                        data_file: data_file.clone(),
                    },
                );
            }
        }

        let mut variants = Vec::with_capacity(config.variants.len());
        for id in &config.variants {
            let variant = rows.get(id).ok_or_else(|| {
                flare_templates_manifest::Error::unknown_variant(
                    layout.name.as_str(),
                    id.as_str(),
                    available.iter().map(String::as_str),
                )
            })?;
            variants.push(variant.clone());
        }

        let templates = match &config.templates {
            Some(listed) => listed_templates(&layout, listed)?,
            None => discover_templates(&layout)?,
        };
        if templates.is_empty() {
            warn!(
                template_set = %layout.name,
                dir = %layout.template_dir.display(),
                "template set has no templates"
            );
        }

        let header = layout.header.as_ref().map(Header::load).transpose()?;

        debug!(
            template_set = %layout.name,
            templates = templates.len(),
            variants = variants.len(),
            "resolved template set"
        );

        Ok(Self {
            source_set: layout.source_set,
            name: layout.name,
            template_dir: layout.template_dir,
            output_dir: layout.output_dir,
            owns_output_dir: layout.owns_output_dir,
            data_files: layout.data_files,
            templates,
            variants,
            header,
            name_token: config.name_token.clone(),
            template_suffix: config.template_suffix.clone(),
        })
    }

    pub fn source_set(&self) -> &str {
        &self.source_set
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn owns_output_dir(&self) -> bool {
        self.owns_output_dir
    }

    pub fn data_files(&self) -> &[PathBuf] {
        &self.data_files
    }

    pub fn templates(&self) -> &[TemplateSource] {
        &self.templates
    }

    /// Requested variants, in the configured order.
    pub fn resolved_variants(&self) -> &[ResolvedVariant] {
        &self.variants
    }

    pub fn variant(&self, id: &str) -> Option<&ResolvedVariant> {
        self.variants.iter().find(|v| v.id() == id)
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn name_token(&self) -> &str {
        &self.name_token
    }

    pub fn template_suffix(&self) -> &str {
        &self.template_suffix
    }

    /// Output path of a template for a variant, relative to the output directory.
    pub fn relative_output(&self, template: &TemplateSource, variant: &str) -> PathBuf {
        naming::output_path(
            template.relative(),
            variant,
            &self.name_token,
            &self.template_suffix,
        )
    }

    /// Number of outputs this set expands to.
    pub fn pair_count(&self) -> usize {
        self.templates.len() * self.variants.len()
    }
}

fn listed_templates(layout: &TemplateSetLayout, listed: &[PathBuf]) -> Result<Vec<TemplateSource>> {
    listed
        .iter()
        .map(|relative| {
            let path = layout.template_dir.join(relative);
            if !path.is_file() {
                return Err(GenerateError::MissingTemplate {
                    template_set: layout.name.clone(),
                    path,
                });
            }
            Ok(TemplateSource {
                path,
                relative: relative.clone(),
            })
        })
        .collect()
}

fn discover_templates(layout: &TemplateSetLayout) -> Result<Vec<TemplateSource>> {
    if !layout.template_dir.is_dir() {
        return Err(GenerateError::MissingTemplates {
            template_set: layout.name.clone(),
            dir: layout.template_dir.clone(),
        });
    }

    let files =
        list_files(&layout.template_dir).map_err(|e| GenerateError::io(&layout.template_dir, e))?;

    Ok(files
        .into_iter()
        .filter_map(|path| {
            let relative = path.strip_prefix(&layout.template_dir).ok()?.to_path_buf();
            let hidden = relative
                .components()
                .any(|c| c.as_os_str().to_string_lossy().starts_with('.'));
            (!hidden).then_some(TemplateSource { path, relative })
        })
        .collect())
}
