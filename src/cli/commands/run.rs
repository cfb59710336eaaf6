//! `slat run` command - execute analysis scripts

use console::style;
use miette::{Result, WrapErr};
use std::path::PathBuf;
use tracing::info;

use crate::cli::helpers::{collect_scripts, load_config, ConfigOverrides};
use crate::cli::GlobalOpts;
use crate::core::Session;
use crate::script::{self, Mode, Script};

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Script files or directories to run
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Directory for recorder output files
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,

    /// Directory that import commands read from
    #[arg(long, short = 'i')]
    pub input_dir: Option<PathBuf>,

    /// Field width of text tables
    #[arg(long, short = 'w')]
    pub width: Option<usize>,

    /// Initial integration tolerance
    #[arg(long)]
    pub tolerance: Option<f64>,
}

pub fn run(args: RunArgs, global: &GlobalOpts) -> Result<()> {
    let overrides = ConfigOverrides {
        output_dir: args.output_dir,
        input_dir: args.input_dir,
        width: args.width,
        tolerance: args.tolerance,
    };
    let config = load_config(global, &overrides);
    let scripts = collect_scripts(&args.paths)?;

    if scripts.is_empty() {
        return Err(miette::miette!("No scripts found"));
    }

    let mut commands = 0;
    for path in &scripts {
        let script = Script::load(path)?;
        info!(script = %path.display(), commands = script.commands.len(), "running script");

        let mut session = Session::new(&config);
        commands += script::run(&mut session, &script, Mode::Execute)
            .wrap_err_with(|| format!("Script {} failed", path.display()))?;
        session
            .console()
            .flush()
            .map_err(|e| miette::miette!("Failed to flush output: {}", e))?;
    }

    if !global.quiet {
        eprintln!(
            "{} Ran {} script(s), {} command(s)",
            style("✓").green(),
            scripts.len(),
            commands
        );
    }
    Ok(())
}
