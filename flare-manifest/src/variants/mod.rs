//! Variant tables: YAML documents describing one substitution row per
//! generated variant.
//!
//! ```yaml
//! - id: int
//!   boxed: Integer
//!   default: "0"
//! - id: long
//!   boxed: Long
//!   default: "0L"
//! ```

mod cache;

use std::{
    collections::BTreeSet,
    fmt,
    path::{Path, PathBuf},
};

pub use cache::VariantTableCache;
use flare_templates_core::ContentHash;
use indexmap::IndexMap;
use miette::SourceSpan;
use serde::Serialize;

use crate::{Error, Result};

/// Key every row must carry; its value is the variant identifier.
pub const ID_KEY: &str = "id";

/// A value in a variant row.
///
/// Numbers keep their literal YAML text, so `0.0` stays `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Bool(bool),
    /// Multi-valued field, iterated by `#each` blocks
    List(Vec<String>),
}

impl Value {
    /// Truthiness used by conditional blocks.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Text(s) => !matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "" | "false" | "no" | "off" | "0"
            ),
            Value::List(items) => !items.is_empty(),
        }
    }

    /// Items iterated by a loop block. A scalar yields itself once.
    pub fn items(&self) -> Vec<Value> {
        match self {
            Value::List(items) => items.iter().cloned().map(Value::Text).collect(),
            other => vec![other.clone()],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// One row of a variant table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantRow {
    id: String,
    fields: IndexMap<String, Value>,
}

impl VariantRow {
    /// Build a row from its fields. Returns `None` when the `id` field is
    /// missing or is not a text value.
    pub fn new(fields: IndexMap<String, Value>) -> Option<Self> {
        let id = match fields.get(ID_KEY)? {
            Value::Text(id) if !id.is_empty() => id.clone(),
            _ => return None,
        };
        Some(Self { id, fields })
    }

    /// The variant identifier (value of the `id` key).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All fields in document order.
    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    /// The row's key set, sorted.
    pub fn key_set(&self) -> BTreeSet<&str> {
        self.fields.keys().map(|k| k.as_str()).collect()
    }

    /// Order-independent text form used for fingerprinting.
    pub fn canonical(&self) -> String {
        let mut keys: Vec<&String> = self.fields.keys().collect();
        keys.sort();

        let mut out = String::new();
        for key in keys {
            let value = &self.fields[key.as_str()];
            let kind = match value {
                Value::Text(_) => "s",
                Value::Bool(_) => "b",
                Value::List(_) => "l",
            };
            match value {
                Value::List(items) => {
                    out.push_str(&format!("{}:{}:{}\n", key, kind, items.len()));
                    for item in items {
                        out.push_str(&format!("  {:?}\n", item));
                    }
                }
                other => out.push_str(&format!("{}:{}:{:?}\n", key, kind, other.to_string())),
            }
        }
        out
    }
}

/// A parsed variant table.
#[derive(Debug, Clone)]
pub struct VariantTable {
    path: PathBuf,
    hash: ContentHash,
    rows: Vec<VariantRow>,
}

impl VariantTable {
    /// Read and parse a variant table.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Box::new(Error::Io {
                path: path.to_path_buf(),
                source: e,
            })
        })?;
        Self::parse(&content, path)
    }

    /// Parse a variant table from YAML content; `path` is used for identity and errors.
    pub fn parse(content: &str, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let malformed = |reason: String, span: Option<SourceSpan>| {
            Error::malformed_variant_data(path, content, reason, span)
        };

        let document: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| {
            let span = e
                .location()
                .map(|loc| SourceSpan::from((loc.index(), 1)));
            malformed(e.to_string(), span)
        })?;

        let entries = match document {
            serde_yaml::Value::Sequence(entries) => entries,
            other => {
                return Err(malformed(
                    format!("expected a sequence of rows, found {}", kind_of(&other)),
                    None,
                ));
            }
        };

        let mut rows: Vec<VariantRow> = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let row_no = index + 1;
            let row = parse_row(entry)
                .map_err(|reason| malformed(format!("row {}: {}", row_no, reason), None))?;

            if let Some(dup) = rows.iter().find(|r| r.id() == row.id()) {
                return Err(malformed(
                    format!("row {}: duplicate variant id '{}'", row_no, dup.id()),
                    find_id_span(content, row.id()),
                ));
            }

            if let Some(first) = rows.first()
                && first.key_set() != row.key_set()
            {
                return Err(malformed(
                    format!(
                        "row {} ('{}') has keys [{}] but row 1 ('{}') has keys [{}]",
                        row_no,
                        row.id(),
                        join_keys(&row.key_set()),
                        first.id(),
                        join_keys(&first.key_set()),
                    ),
                    find_id_span(content, row.id()),
                ));
            }

            rows.push(row);
        }

        Ok(Self {
            path: path.to_path_buf(),
            hash: ContentHash::from_bytes(content.as_bytes()),
            rows,
        })
    }

    /// Path of the data file this table was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hash of the data file content.
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Rows in document order.
    pub fn rows(&self) -> &[VariantRow] {
        &self.rows
    }

    /// Find the row for a variant id.
    pub fn row(&self, id: &str) -> Option<&VariantRow> {
        self.rows.iter().find(|r| r.id() == id)
    }

    /// Variant ids in document order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.id())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn parse_row(entry: &serde_yaml::Value) -> std::result::Result<VariantRow, String> {
    let mapping = match entry {
        serde_yaml::Value::Mapping(mapping) => mapping,
        other => return Err(format!("expected a mapping, found {}", kind_of(other))),
    };

    let mut fields = IndexMap::with_capacity(mapping.len());
    for (key, value) in mapping {
        let key = match key {
            serde_yaml::Value::String(key) => key.clone(),
            other => return Err(format!("keys must be strings, found {}", kind_of(other))),
        };
        let value = parse_value(value).map_err(|reason| format!("key '{}': {}", key, reason))?;
        fields.insert(key, value);
    }

    match fields.get(ID_KEY) {
        None => return Err(format!("missing '{}' key", ID_KEY)),
        Some(Value::Text(id)) if !id.is_empty() => {}
        Some(_) => return Err(format!("'{}' must be a non-empty string", ID_KEY)),
    }

    VariantRow::new(fields).ok_or_else(|| format!("invalid '{}' value", ID_KEY))
}

fn parse_value(value: &serde_yaml::Value) -> std::result::Result<Value, String> {
    match value {
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .map(|item| {
                scalar_text(item)
                    .ok_or_else(|| format!("list items must be scalars, found {}", kind_of(item)))
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::List),
        other => scalar_text(other)
            .map(Value::Text)
            .ok_or_else(|| format!("unsupported value: {}", kind_of(other))),
    }
}

fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn kind_of(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}

fn join_keys(keys: &BTreeSet<&str>) -> String {
    keys.iter().copied().collect::<Vec<_>>().join(", ")
}

/// Best-effort span of a row's `id: <value>` line.
fn find_id_span(src: &str, id: &str) -> Option<SourceSpan> {
    [
        format!("{}: {}", ID_KEY, id),
        format!("{}: \"{}\"", ID_KEY, id),
        format!("{}: '{}'", ID_KEY, id),
    ]
    .iter()
    .find_map(|pattern| {
        src.rfind(pattern.as_str())
            .map(|pos| SourceSpan::from((pos, pattern.len())))
    })
}
