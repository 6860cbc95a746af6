//! Error types for template generation.

use std::path::PathBuf;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::render::RenderError;

pub type Result<T> = std::result::Result<T, GenerateError>;

/// Category of a single (template, variant) failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnresolvedPlaceholder,
    TemplateSyntax,
    Io,
    OutputCollision,
}

/// One failed (template, variant) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error, Diagnostic)]
#[error("{template_set}/{template} [{variant}]: {message}")]
#[diagnostic(code(flare::pair_failed))]
pub struct PairFailure {
    pub template_set: String,
    pub template: String,
    pub variant: String,
    pub kind: FailureKind,
    pub message: String,
}

impl PairFailure {
    pub fn new(
        template_set: impl Into<String>,
        template: impl Into<String>,
        variant: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            template_set: template_set.into(),
            template: template.into(),
            variant: variant.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn render(
        template_set: impl Into<String>,
        template: impl Into<String>,
        variant: impl Into<String>,
        error: &RenderError,
    ) -> Self {
        let kind = match error {
            RenderError::UnresolvedPlaceholder { .. } => FailureKind::UnresolvedPlaceholder,
            RenderError::Syntax { .. } => FailureKind::TemplateSyntax,
        };
        Self::new(template_set, template, variant, kind, error.to_string())
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum GenerateError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Manifest(flare_templates_manifest::Error),

    #[error("template directory '{dir}' of template set '{template_set}' does not exist")]
    #[diagnostic(
        code(flare::missing_templates),
        help("create the directory or point 'template_dir' at the templates")
    )]
    MissingTemplates { template_set: String, dir: PathBuf },

    #[error("template '{path}' of template set '{template_set}' does not exist")]
    #[diagnostic(code(flare::missing_template))]
    MissingTemplate { template_set: String, path: PathBuf },

    #[error(
        "variant '{variant}' of template set '{template_set}' is defined in both '{}' and '{}'",
        .first.display(),
        .second.display()
    )]
    #[diagnostic(
        code(flare::duplicate_variant),
        help("each variant id may appear in only one of a template set's data files")
    )]
    DuplicateVariant {
        template_set: String,
        variant: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("failed to access '{}'", .path.display())]
    #[diagnostic(code(flare::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("task '{}' failed: {}", .task, summarize(.failures))]
    #[diagnostic(code(flare::generation_failed))]
    GenerationFailed {
        task: String,
        failures: Vec<PairFailure>,
    },
}

impl GenerateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Per-pair failures, empty unless this is [`GenerateError::GenerationFailed`].
    pub fn failures(&self) -> &[PairFailure] {
        match self {
            Self::GenerationFailed { failures, .. } => failures,
            _ => &[],
        }
    }
}

impl From<Box<flare_templates_manifest::Error>> for GenerateError {
    fn from(error: Box<flare_templates_manifest::Error>) -> Self {
        Self::Manifest(*error)
    }
}

fn summarize(failures: &[PairFailure]) -> String {
    let mut out = format!("{} template variant(s) failed to generate", failures.len());
    for failure in failures {
        out.push_str("\n  - ");
        out.push_str(&failure.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_failed_lists_every_pair() {
        let err = GenerateError::GenerationFailed {
            task: "generateTemplates".to_string(),
            failures: vec![
                PairFailure::render(
                    "primitive",
                    "VariantHolder.java.tmpl",
                    "int",
                    &RenderError::UnresolvedPlaceholder {
                        key: "boxed".to_string(),
                        line: 3,
                    },
                ),
                PairFailure::new(
                    "primitive",
                    "Other.java.tmpl",
                    "long",
                    FailureKind::Io,
                    "disk full",
                ),
            ],
        };

        let message = err.to_string();
        assert!(message.starts_with("task 'generateTemplates' failed: 2 template variant(s)"));
        assert!(message.contains(
            "primitive/VariantHolder.java.tmpl [int]: unresolved placeholder 'boxed' on line 3"
        ));
        assert!(message.contains("primitive/Other.java.tmpl [long]: disk full"));
        assert_eq!(err.failures().len(), 2);
        assert_eq!(err.failures()[0].kind, FailureKind::UnresolvedPlaceholder);
    }

    #[test]
    fn test_manifest_errors_unbox() {
        let err: GenerateError =
            flare_templates_manifest::Error::unknown_variant("primitive", "short", ["int"]).into();
        assert!(matches!(err, GenerateError::Manifest(_)));
        assert!(err.failures().is_empty());
    }
}
