use miette::Diagnostic;
use thiserror::Error;

/// Failure while parsing or expanding a single template.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum RenderError {
    #[error("unresolved placeholder '{key}' on line {line}")]
    #[diagnostic(
        code(flare::unresolved_placeholder),
        help("add '{key}' to the variant row or remove it from the template")
    )]
    UnresolvedPlaceholder { key: String, line: usize },

    #[error("template syntax error on line {line}: {message}")]
    #[diagnostic(code(flare::template_syntax))]
    Syntax { line: usize, message: String },
}

impl RenderError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    /// 1-based template line the error points at.
    pub fn line(&self) -> usize {
        match self {
            Self::UnresolvedPlaceholder { line, .. } | Self::Syntax { line, .. } => *line,
        }
    }
}
