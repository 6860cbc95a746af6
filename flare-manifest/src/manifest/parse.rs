//! Manifest parsing from files and strings.

use std::{collections::HashSet, path::Path, str::FromStr};

use super::{DEFAULT_CONFIG_FILE, Manifest, TemplateSetConfig, validate::ParseContext};
use crate::{Error, Result, error::SourceContext};

impl FromStr for Manifest {
    type Err = Box<Error>;

    fn from_str(s: &str) -> Result<Self> {
        parse_manifest(s, DEFAULT_CONFIG_FILE)
    }
}

impl Manifest {
    /// Parse a configuration file from the given path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Box::new(Error::Io {
                path: path.to_path_buf(),
                source: e,
            })
        })?;
        parse_manifest(&content, &path.display().to_string())
    }

    /// Parse a configuration from a string with a custom filename for error reporting.
    pub fn from_str_with_filename(content: &str, filename: &str) -> Result<Self> {
        parse_manifest(content, filename)
    }
}

/// Parse a manifest from content with the given filename for error reporting.
pub fn parse_manifest(content: &str, filename: &str) -> Result<Manifest> {
    let source_ctx = SourceContext::new(content, filename);
    let manifest: Manifest = toml::from_str(content).map_err(|e| source_ctx.parse_error(e))?;
    validate_manifest(&manifest, content, filename)?;
    Ok(manifest)
}

/// Validate the manifest after parsing.
fn validate_manifest(manifest: &Manifest, src: &str, filename: &str) -> Result<()> {
    let ctx = ParseContext::new(src, filename);

    validate_step(&ctx, manifest.project.format_step.as_deref(), "format_step")?;

    for (set_name, source_set) in &manifest.source_sets {
        ctx.validate_name(set_name, "source set")?;

        let set_ctx = ctx.push(set_name);
        validate_step(&set_ctx, source_set.compile_step.as_deref(), "compile_step")?;
        validate_step(&set_ctx, source_set.format_step.as_deref(), "format_step")?;

        for (name, template_set) in &source_set.template_sets {
            set_ctx.validate_name(name, "template set")?;
            validate_template_set(&set_ctx.push(name), name, template_set)?;
        }
    }
    Ok(())
}

fn validate_step(ctx: &ParseContext<'_>, step: Option<&str>, key: &str) -> Result<()> {
    match step {
        Some(step) if step.trim().is_empty() => Err(ctx.validation_error(
            format!("{} must not be empty", ctx.context_for(key)),
            key,
        )),
        _ => Ok(()),
    }
}

fn validate_template_set(
    ctx: &ParseContext<'_>,
    name: &str,
    config: &TemplateSetConfig,
) -> Result<()> {
    if config.data_files.is_empty() {
        return Err(ctx.validation_error(
            format!("template set '{}' declares no data files", name),
            name,
        ));
    }

    if config.variants.is_empty() {
        return Err(ctx.validation_error(
            format!("template set '{}' requests no variants", name),
            name,
        ));
    }

    let mut seen = HashSet::new();
    for variant in &config.variants {
        if variant.trim().is_empty() {
            return Err(ctx.validation_error(
                format!("template set '{}' requests an empty variant id", name),
                name,
            ));
        }
        if !seen.insert(variant.as_str()) {
            return Err(ctx.validation_error(
                format!(
                    "variant '{}' is requested more than once in template set '{}'",
                    variant, name
                ),
                &format!("\"{}\"", variant),
            ));
        }
    }

    if config.name_token.is_empty() {
        return Err(ctx.validation_error(
            format!("name_token of template set '{}' must not be empty", name),
            "name_token",
        ));
    }

    Ok(())
}
