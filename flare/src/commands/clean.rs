use std::path::PathBuf;

use clap::Args;
use eyre::Result;
use flare_templates_codegen::TemplatesPlugin;
use flare_templates_manifest::{DEFAULT_CONFIG_FILE, ManifestFile};

use super::UnwrapOrExit;
use crate::{
    ops,
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct CleanCommand {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Only clean this source set (defaults to every source set)
    #[arg(short, long)]
    pub source_set: Option<String>,

    /// Preview what would be deleted without actually deleting
    #[arg(long)]
    pub dry_run: bool,
}

impl CleanCommand {
    pub fn run(&self) -> Result<()> {
        let file = ManifestFile::open(&self.config).unwrap_or_exit();
        let graph = TemplatesPlugin::apply(&file).unwrap_or_exit();
        let tasks = ops::select_tasks(&graph, self.source_set.as_deref())?;

        let report = ops::clean(&file, &graph, &tasks, self.dry_run).unwrap_or_exit();

        report.render(&mut TerminalOutput::new());
        Ok(())
    }
}
