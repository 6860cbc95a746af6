use std::io::{self, Write};

use clap::{Args, CommandFactory};
use clap_complete::Shell;
use eyre::Result;

use super::Cli;

#[derive(Args)]
pub struct CompletionsCommand {
    /// Shell to generate completions for
    shell: Shell,
}

impl CompletionsCommand {
    pub fn run(&self) -> Result<()> {
        write_completions(self.shell, &mut io::stdout().lock())
    }
}

fn write_completions(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, bin, out);
    out.flush()?;
    Ok(())
}
