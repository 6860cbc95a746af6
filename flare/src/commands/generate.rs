use std::path::PathBuf;

use clap::Args;
use eyre::Result;
use flare_templates_codegen::{RunOptions, TemplatesPlugin};
use flare_templates_manifest::{DEFAULT_CONFIG_FILE, ManifestFile};

use super::UnwrapOrExit;
use crate::{
    ops,
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct GenerateCommand {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Only generate this source set (defaults to every source set)
    #[arg(short, long)]
    pub source_set: Option<String>,

    /// Regenerate everything, ignoring recorded state
    #[arg(long)]
    pub force: bool,

    /// Preview generated files without writing to disk
    #[arg(long)]
    pub dry_run: bool,
}

impl GenerateCommand {
    pub fn run(&self) -> Result<()> {
        let file = ManifestFile::open(&self.config).unwrap_or_exit();
        let graph = TemplatesPlugin::apply(&file).unwrap_or_exit();
        let tasks = ops::select_tasks(&graph, self.source_set.as_deref())?;

        let report = ops::generate(
            &file,
            &graph,
            &tasks,
            RunOptions {
                force: self.force,
                dry_run: self.dry_run,
            },
        )
        .unwrap_or_exit();

        report.render(&mut TerminalOutput::new());
        Ok(())
    }
}
