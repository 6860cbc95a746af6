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
pub struct CheckCommand {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

impl CheckCommand {
    pub fn run(&self) -> Result<()> {
        let file = ManifestFile::open(&self.config).unwrap_or_exit();
        let graph = TemplatesPlugin::apply(&file).unwrap_or_exit();

        let report = ops::check(&file, &graph).unwrap_or_exit();
        report.render(&mut TerminalOutput::new());

        if !report.is_valid() {
            std::process::exit(1);
        }
        Ok(())
    }
}
