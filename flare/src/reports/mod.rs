//! Report data structures for commands.
//!
//! This module provides data structures that separate data collection from rendering.
//! Commands build reports, then render them to an Output target.

mod check;
mod clean;
mod generate;
mod output;
mod plan;

use std::path::Path;

pub use check::CheckReport;
pub use clean::CleanReport;
pub use generate::GenerateReport;
#[cfg(test)]
pub use output::RecordingOutput;
pub use output::{Report, TerminalOutput};
pub use plan::{PlanReport, PlannedTask};

/// Path as shown to the user: relative to the project root when below it.
pub(crate) fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
