use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::ContentHash;

/// Write `content` to `path` through a sibling temporary file and a rename.
///
/// A reader never observes a half-written file: either the old content or
/// the new content is on disk.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// List every regular file below `dir`, sorted by path.
///
/// Returns an empty list when `dir` does not exist.
pub fn list_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Remove empty directories below `dir`, walking up to (but never removing) `base`.
pub fn remove_empty_dirs(dir: &Path, base: &Path) -> io::Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let mut dirs: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();
    // Deepest first so parents see their children already removed
    dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));

    for d in dirs {
        if std::fs::read_dir(&d)?.next().is_none() {
            std::fs::remove_dir(&d)?;
        }
    }

    let mut current = Some(dir);
    while let Some(d) = current {
        if d == base || !d.starts_with(base) {
            break;
        }
        if d.exists() && std::fs::read_dir(d)?.next().is_none() {
            std::fs::remove_dir(d)?;
        }
        current = d.parent();
    }
    Ok(())
}

/// Result of a write operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written
    Written,
    /// File already held identical bytes and was left untouched
    Unchanged,
}

/// A file to be generated
#[derive(Debug, Clone)]
pub struct OutputFile {
    path: PathBuf,
    content: String,
}

impl OutputFile {
    /// Create a new output file with the given path and content
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Hash of the file content
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::from_bytes(self.content.as_bytes())
    }

    /// Write the file, skipping the write when the bytes on disk already match
    pub fn write(&self) -> io::Result<WriteResult> {
        if let Ok(existing) = std::fs::read(&self.path)
            && existing == self.content.as_bytes()
        {
            return Ok(WriteResult::Unchanged);
        }
        write_atomic(&self.path, self.content.as_bytes())?;
        Ok(WriteResult::Written)
    }
}
