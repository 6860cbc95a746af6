//! Per-invocation cache of parsed variant tables.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use flare_templates_core::ContentHash;
use tracing::debug;

use super::VariantTable;
use crate::{Error, Result};

/// Caches parsed [`VariantTable`]s keyed by `(path, content hash)`.
///
/// Several template sets commonly share one data file; it is parsed once and
/// handed out as a shared reference. An edited file hashes differently and is
/// parsed again.
#[derive(Debug, Default)]
pub struct VariantTableCache {
    tables: HashMap<(PathBuf, ContentHash), Arc<VariantTable>>,
    hits: usize,
}

impl VariantTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a table, parsing it only if this exact content has not been seen.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Arc<VariantTable>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Box::new(Error::Io {
                path: path.to_path_buf(),
                source: e,
            })
        })?;
        let key = (
            path.to_path_buf(),
            ContentHash::from_bytes(content.as_bytes()),
        );

        if let Some(table) = self.tables.get(&key) {
            self.hits += 1;
            debug!(path = %path.display(), "variant table cache hit");
            return Ok(Arc::clone(table));
        }

        debug!(path = %path.display(), "parsing variant table");
        let table = Arc::new(VariantTable::parse(&content, path)?);
        self.tables.insert(key, Arc::clone(&table));
        Ok(table)
    }

    /// Number of distinct tables parsed so far.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Number of loads served without parsing.
    pub fn hits(&self) -> usize {
        self.hits
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_repeated_load_is_cached() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("primitive.yaml");
        std::fs::write(&path, "- id: int\n- id: long\n").unwrap();

        let mut cache = VariantTableCache::new();
        let a = cache.load(&path).unwrap();
        let b = cache.load(&path).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn test_changed_content_is_reparsed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("primitive.yaml");
        std::fs::write(&path, "- id: int\n").unwrap();

        let mut cache = VariantTableCache::new();
        let a = cache.load(&path).unwrap();
        std::fs::write(&path, "- id: int\n- id: long\n").unwrap();
        let b = cache.load(&path).unwrap();

        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.hits(), 0);
    }

    #[test]
    fn test_malformed_table_is_not_cached() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.yaml");
        std::fs::write(&path, "not: a sequence\n").unwrap();

        let mut cache = VariantTableCache::new();
        assert!(cache.load(&path).is_err());
        assert!(cache.is_empty());
    }
}
