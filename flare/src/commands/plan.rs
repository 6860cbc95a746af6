use std::path::PathBuf;

use clap::Args;
use eyre::Result;
use flare_templates_codegen::TemplatesPlugin;
use flare_templates_manifest::{DEFAULT_CONFIG_FILE, ManifestFile};

use super::UnwrapOrExit;
use crate::{
    ops::{self, plan::PlanFormat},
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct PlanCommand {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = PlanFormat::Text)]
    pub format: PlanFormat,
}

impl PlanCommand {
    pub fn run(&self) -> Result<()> {
        let file = ManifestFile::open(&self.config).unwrap_or_exit();
        let graph = TemplatesPlugin::apply(&file).unwrap_or_exit();

        let report = ops::plan(&file, &graph, self.format)?;

        report.render(&mut TerminalOutput::new());
        Ok(())
    }
}
