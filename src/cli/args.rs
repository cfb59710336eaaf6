//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    check::CheckArgs, completions::CompletionsArgs, list::ListArgs, run::RunArgs,
};
use crate::recorder::TableFormat;

#[derive(Parser)]
#[command(name = "slat")]
#[command(author, version, about = "Seismic loss assessment")]
#[command(long_about = "Runs seismic loss analysis scripts: hazard curves, demand models, fragility and loss functions, and the recorders that report on them.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute analysis scripts
    Run(RunArgs),

    /// Check scripts without running their analyses
    Check(CheckArgs),

    /// List the entities a script defines
    List(ListArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Use the configured format (text unless configured otherwise)
    #[default]
    Auto,
    /// Fixed-width text columns
    Text,
    /// CSV format (for spreadsheets)
    Csv,
    /// JSON format (for programming)
    Json,
}

impl OutputFormat {
    /// The table format this selects, if it overrides the configured one
    pub fn table_format(self) -> Option<TableFormat> {
        match self {
            OutputFormat::Auto => None,
            OutputFormat::Text => Some(TableFormat::Text),
            OutputFormat::Csv => Some(TableFormat::Csv),
            OutputFormat::Json => Some(TableFormat::Json),
        }
    }
}
