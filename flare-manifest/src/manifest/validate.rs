//! Validation context and utilities for manifest parsing.

use std::sync::Arc;

use miette::SourceSpan;

use crate::{Error, Result, error::SourceContext};

/// Parsing and validation context that carries source information.
///
/// This struct encapsulates the source content, filename, and current path
/// through the manifest hierarchy, making it easier to pass validation
/// context through nested tables.
///
/// # Example
///
/// ```ignore
/// let ctx = ParseContext::new(src, "flare-templates.toml");
/// ctx.validate_name("main", "source set")?;
///
/// // For nested validation
/// let nested = ctx.push("main");
/// nested.validate_name("primitive", "template set")?;
/// ```
#[derive(Debug, Clone)]
pub struct ParseContext<'a> {
    /// Source context for error reporting (shared across nested contexts)
    source: Arc<SourceContext>,
    /// Path segments for nested validation (e.g., ["main", "primitive"])
    path: Vec<&'a str>,
}

impl<'a> ParseContext<'a> {
    /// Create a new parse context with the given source and filename.
    pub fn new(src: &str, filename: &str) -> Self {
        Self {
            source: Arc::new(SourceContext::new(src, filename)),
            path: Vec::new(),
        }
    }

    /// Push a path segment and return a new context.
    pub fn push(&self, segment: &'a str) -> Self {
        let mut new_path = self.path.clone();
        new_path.push(segment);
        Self {
            source: Arc::clone(&self.source),
            path: new_path,
        }
    }

    /// Get the current path as a dot-separated string.
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }

    /// Get a context description for error messages.
    ///
    /// For example: "template set in 'main'" or just "source set" if no path.
    pub fn context_for(&self, kind: &str) -> String {
        if self.path.is_empty() {
            kind.to_string()
        } else {
            format!("{} in '{}'", kind, self.path_string())
        }
    }

    /// Find the span of a name in the source.
    pub fn find_span(&self, name: &str) -> Option<SourceSpan> {
        find_name_span(self.source.src(), name)
    }

    /// Create a validation error pointing at the first occurrence of `needle`.
    pub fn validation_error(&self, message: impl Into<String>, needle: &str) -> Box<Error> {
        self.source
            .validation_error(message, self.find_span(needle))
    }

    /// Validate that a name is a valid identifier.
    pub fn validate_name(&self, name: &str, kind: &str) -> Result<()> {
        if let Some(reason) = validate_identifier(name) {
            return Err(self.source.invalid_identifier_error(
                name,
                self.context_for(kind),
                reason,
                self.find_span(name),
            ));
        }
        Ok(())
    }
}

/// Find the span of a name in the TOML source
///
/// Table headers (`.name]`, `.name.`) are preferred over bare occurrences so
/// a set name points at its declaration rather than at some value.
pub(crate) fn find_name_span(src: &str, name: &str) -> Option<SourceSpan> {
    if name.is_empty() {
        return None;
    }

    let header_patterns = [
        format!(".{}]", name),
        format!(".{}.", name),
        format!(".\"{}\"]", name),
        format!(".\"{}\".", name),
    ];

    for pattern in &header_patterns {
        if let Some(pos) = src.find(pattern.as_str()) {
            // +1 to skip the leading dot
            return Some(SourceSpan::from((pos + 1, pattern.len() - 2)));
        }
    }

    src.find(name).map(|pos| SourceSpan::from((pos, name.len())))
}

/// Validate that a name is a usable source set or template set name.
/// Returns None if valid, Some(reason) if invalid
pub(crate) fn validate_identifier(name: &str) -> Option<&'static str> {
    let mut chars = name.chars();

    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        Some(_) => return Some("name must start with a letter or underscore"),
        None => return Some("name cannot be empty"),
    }

    if chars.any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '-')) {
        return Some("name contains invalid characters");
    }

    None
}
