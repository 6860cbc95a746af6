mod check;
mod clean;
mod completions;
mod generate;
mod plan;

use check::CheckCommand;
use clap::{ArgAction, Parser, Subcommand};
use clean::CleanCommand;
use completions::CompletionsCommand;
use eyre::Result;
use generate::GenerateCommand;
use plan::PlanCommand;
use tracing_subscriber::EnvFilter;

/// Extension trait for exiting on diagnostics with pretty formatting
pub(crate) trait UnwrapOrExit<T> {
    fn unwrap_or_exit(self) -> T;
}

impl<T> UnwrapOrExit<T> for flare_templates_manifest::Result<T> {
    fn unwrap_or_exit(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                eprintln!("{:?}", miette::Report::new(*e));
                std::process::exit(1);
            }
        }
    }
}

impl<T> UnwrapOrExit<T> for flare_templates_codegen::Result<T> {
    fn unwrap_or_exit(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                eprintln!("{:?}", miette::Report::new(e));
                std::process::exit(1);
            }
        }
    }
}

#[derive(Parser)]
#[command(name = "flare-templates")]
#[command(version)]
#[command(about = "Generate source file variants from templates and YAML variant tables")]
pub(crate) struct Cli {
    /// Increase log verbosity (-v for info, -vv for debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Install the log subscriber. `RUST_LOG` overrides the verbosity flag.
    pub fn init_tracing(&self) {
        let default = match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    pub fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Generate(cmd) => cmd.run(),
            Commands::Check(cmd) => cmd.run(),
            Commands::Clean(cmd) => cmd.run(),
            Commands::Plan(cmd) => cmd.run(),
            Commands::Completions(cmd) => cmd.run(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate sources for one or every source set
    Generate(GenerateCommand),

    /// Validate the configuration and render every template without writing
    Check(CheckCommand),

    /// Remove generated sources and generation state
    Clean(CleanCommand),

    /// Show the registered tasks with their inputs, outputs and ordering
    Plan(PlanCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}
