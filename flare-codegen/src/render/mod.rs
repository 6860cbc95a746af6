//! Placeholder expansion for template bodies.
//!
//! [`Template`] parses once and renders many times; [`TemplateEngine`] is the
//! one-shot `render(body, row)` entry point, optionally carrying global values
//! visible to every row.

mod error;
mod parser;
mod template;

pub use error::RenderError;
use flare_templates_manifest::{Value, VariantRow};
use indexmap::IndexMap;
pub use parser::{DEFAULT_BINDING, Filter};
pub use template::Template;

/// Renders template bodies against variant rows.
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    globals: IndexMap<String, Value>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value visible to every render when the row does not define it.
    pub fn with_global(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.insert(key.into(), value.into());
        self
    }

    pub fn globals(&self) -> &IndexMap<String, Value> {
        &self.globals
    }

    /// Parse and expand `body` against `row`.
    pub fn render(&self, body: &str, row: &VariantRow) -> Result<String, RenderError> {
        Template::parse(body)?.render_with(row, &self.globals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_render() {
        let row = VariantRow::new(
            [("id".to_string(), Value::from("long"))]
                .into_iter()
                .collect(),
        )
        .unwrap();
        let engine = TemplateEngine::new().with_global("package", "org.example");

        assert_eq!(
            engine.render("package ${package};\n// ${id}\n", &row).unwrap(),
            "package org.example;\n// long\n"
        );
        assert!(matches!(
            engine.render("${#if id}", &row),
            Err(RenderError::Syntax { .. })
        ));
    }
}
