use flare_templates_manifest::{Value, VariantRow};
use indexmap::IndexMap;

use super::{
    RenderError,
    parser::{self, Node},
};

/// A parsed template, ready to be expanded against any number of rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, RenderError> {
        Ok(Self {
            nodes: parser::parse(source)?,
        })
    }

    /// Expand against a single row.
    pub fn render(&self, row: &VariantRow) -> Result<String, RenderError> {
        self.render_with(row, &IndexMap::new())
    }

    /// Expand against a row, falling back to `globals` for keys the row lacks.
    pub fn render_with(
        &self,
        row: &VariantRow,
        globals: &IndexMap<String, Value>,
    ) -> Result<String, RenderError> {
        let mut scope = Scope {
            row,
            globals,
            bindings: Vec::new(),
        };
        let mut out = String::new();
        render_nodes(&self.nodes, &mut scope, &mut out)?;
        Ok(out)
    }
}

/// Lookup chain: innermost loop binding, then the row, then globals.
struct Scope<'a> {
    row: &'a VariantRow,
    globals: &'a IndexMap<String, Value>,
    bindings: Vec<(String, Value)>,
}

impl Scope<'_> {
    fn resolve(&self, key: &str, line: usize) -> Result<&Value, RenderError> {
        self.bindings
            .iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
            .or_else(|| self.row.get(key))
            .or_else(|| self.globals.get(key))
            .ok_or_else(|| RenderError::UnresolvedPlaceholder {
                key: key.to_string(),
                line,
            })
    }
}

fn render_nodes(
    nodes: &[Node],
    scope: &mut Scope<'_>,
    out: &mut String,
) -> Result<(), RenderError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Value { key, filters, line } => {
                let mut text = scope.resolve(key, *line)?.to_string();
                for filter in filters {
                    text = filter.apply(&text);
                }
                out.push_str(&text);
            }
            Node::Condition {
                key,
                negate,
                then,
                otherwise,
                line,
            } => {
                let truthy = scope.resolve(key, *line)?.is_truthy();
                let branch = if truthy != *negate { then } else { otherwise };
                render_nodes(branch, scope, out)?;
            }
            Node::Each {
                key,
                binding,
                body,
                line,
            } => {
                let items = scope.resolve(key, *line)?.items();
                for item in items {
                    scope.bindings.push((binding.clone(), item));
                    let result = render_nodes(body, scope, out);
                    scope.bindings.pop();
                    result?;
                }
            }
        }
    }
    Ok(())
}
