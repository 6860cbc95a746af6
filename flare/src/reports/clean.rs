//! Clean command report data structures.

use std::path::PathBuf;

use super::{
    display_path,
    output::{Output, Report},
};

/// Report data from removing generated sources.
#[derive(Debug)]
pub struct CleanReport {
    /// Project root, for shortening paths.
    pub root: PathBuf,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Removed (or removable) files.
    pub removed: Vec<PathBuf>,
}

impl Report for CleanReport {
    fn render(&self, out: &mut dyn Output) {
        if self.removed.is_empty() {
            out.preformatted("No generated files found.");
            return;
        }

        if self.dry_run {
            out.section("Would delete");
        } else {
            out.section("Deleted");
        }
        for path in &self.removed {
            out.removed_item(&display_path(&self.root, path));
        }
    }
}
