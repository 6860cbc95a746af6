use std::path::{Path, PathBuf};

use super::Manifest;
use crate::Result;

/// Represents a flare-templates.toml file with both raw content and parsed manifest.
pub struct ManifestFile {
    path: PathBuf,
    content: String,
    manifest: Manifest,
}

impl ManifestFile {
    /// Open and parse a configuration file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Box::new(crate::Error::Io {
                path: path.clone(),
                source: e,
            })
        })?;
        let filename = path.display().to_string();
        let manifest = Manifest::from_str_with_filename(&content, &filename)?;

        Ok(Self {
            path,
            content,
            manifest,
        })
    }

    /// Build from an already parsed manifest, as if it had been read from `path`.
    pub fn from_manifest(path: impl Into<PathBuf>, manifest: Manifest) -> Self {
        Self {
            path: path.into(),
            content: String::new(),
            manifest,
        }
    }

    /// Get the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the raw content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Get the parsed manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Directory every relative path in the manifest is resolved against.
    pub fn project_root(&self) -> PathBuf {
        let config_dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        config_dir.join(&self.manifest.project.root)
    }

    /// Resolve a manifest path against the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root().join(path)
        }
    }

    /// Absolute-or-root-relative build directory.
    pub fn build_dir(&self) -> PathBuf {
        self.resolve(&self.manifest.project.build_dir)
    }
}
