use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Result type for manifest operations (boxed to reduce size on stack)
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// Source context for error reporting.
///
/// Encapsulates the source content and filename, reducing parameter passing
/// in error factory functions.
#[derive(Debug, Clone)]
pub struct SourceContext {
    src: String,
    filename: String,
}

impl SourceContext {
    /// Create a new source context.
    pub fn new(src: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            filename: filename.into(),
        }
    }

    /// Get the source content.
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Get the filename.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Create a NamedSource for miette error reporting.
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.filename, self.src.clone())
    }

    /// Create a parse error from a toml error.
    pub fn parse_error(&self, source: toml::de::Error) -> Box<Error> {
        let span = source.span().map(SourceSpan::from);
        Box::new(Error::Parse {
            src: self.named_source(),
            span,
            source,
        })
    }

    /// Create a validation error, optionally pointing at a span.
    pub fn validation_error(
        &self,
        message: impl Into<String>,
        span: Option<SourceSpan>,
    ) -> Box<Error> {
        Box::new(Error::Validation {
            src: self.named_source(),
            span,
            message: message.into(),
        })
    }

    /// Create an invalid identifier error.
    pub fn invalid_identifier_error(
        &self,
        name: impl Into<String>,
        context: impl Into<String>,
        reason: impl Into<String>,
        span: Option<SourceSpan>,
    ) -> Box<Error> {
        Box::new(Error::InvalidIdentifier {
            src: self.named_source(),
            span,
            name: name.into(),
            context: context.into(),
            reason: reason.into(),
        })
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("failed to read '{path}'")]
    #[diagnostic(code(flare::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse template configuration")]
    #[diagnostic(code(flare::parse_error))]
    Parse {
        #[source_code]
        src: NamedSource<String>,
        #[label("parse error here")]
        span: Option<SourceSpan>,
        #[source]
        source: toml::de::Error,
    },

    #[error("{message}")]
    #[diagnostic(code(flare::validation_error))]
    Validation {
        #[source_code]
        src: NamedSource<String>,
        #[label("{message}")]
        span: Option<SourceSpan>,
        message: String,
    },

    #[error("invalid {context} name '{name}'")]
    #[diagnostic(help(
        "{reason}. Use only letters, numbers, '_' and '-', starting with a letter or underscore."
    ))]
    InvalidIdentifier {
        #[source_code]
        src: NamedSource<String>,
        #[label("invalid identifier")]
        span: Option<SourceSpan>,
        name: String,
        context: String,
        reason: String,
    },

    #[error("malformed variant data in '{path}': {reason}")]
    #[diagnostic(
        code(flare::malformed_variant_data),
        help("variant data must be a sequence of flat mappings sharing the same keys, each with an 'id'")
    )]
    MalformedVariantData {
        #[source_code]
        src: NamedSource<String>,
        #[label("{reason}")]
        span: Option<SourceSpan>,
        path: PathBuf,
        reason: String,
    },

    #[error("template set '{template_set}' requests unknown variant '{variant}'")]
    #[diagnostic(code(flare::unknown_variant), help("available variants: {available}"))]
    UnknownVariant {
        template_set: String,
        variant: String,
        available: String,
    },
}

impl Error {
    /// Create a malformed variant data error for the given file content.
    pub fn malformed_variant_data(
        path: impl Into<PathBuf>,
        src: &str,
        reason: impl Into<String>,
        span: Option<SourceSpan>,
    ) -> Box<Self> {
        let path = path.into();
        Box::new(Error::MalformedVariantData {
            src: NamedSource::new(path.display().to_string(), src.to_string()),
            span,
            path,
            reason: reason.into(),
        })
    }

    /// Create an unknown variant error listing the ids that do exist.
    pub fn unknown_variant<'a>(
        template_set: impl Into<String>,
        variant: impl Into<String>,
        available: impl IntoIterator<Item = &'a str>,
    ) -> Box<Self> {
        let available: Vec<&str> = available.into_iter().collect();
        Box::new(Error::UnknownVariant {
            template_set: template_set.into(),
            variant: variant.into(),
            available: if available.is_empty() {
                "none".to_string()
            } else {
                available.join(", ")
            },
        })
    }
}
