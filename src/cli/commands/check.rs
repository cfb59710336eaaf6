//! `slat check` command - validate scripts without running analyses
//!
//! Every command except `analyze` and the console commands is executed, so
//! undefined references, shape mismatches and bad recorder configurations are
//! all reported without computing any output.

use console::style;
use miette::Result;
use std::path::{Path, PathBuf};

use crate::cli::helpers::{collect_scripts, load_config, ConfigOverrides};
use crate::cli::GlobalOpts;
use crate::core::{Config, Session};
use crate::script::{self, Mode, Script};

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Script files or directories to check
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Stop at the first failing script
    #[arg(long)]
    pub fail_fast: bool,

    /// Only show the summary
    #[arg(long)]
    pub summary: bool,
}

#[derive(Default)]
struct CheckStats {
    files_checked: usize,
    files_passed: usize,
    files_failed: usize,
    commands: usize,
}

pub fn run(args: CheckArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global, &ConfigOverrides::default());
    let scripts = collect_scripts(&args.paths)?;
    let mut stats = CheckStats::default();
    let mut first_error = None;

    if !global.quiet {
        println!(
            "{} Checking {} script(s)...\n",
            style("→").blue(),
            scripts.len()
        );
    }

    for path in &scripts {
        stats.files_checked += 1;
        match check_one(&config, path) {
            Ok(n) => {
                stats.files_passed += 1;
                stats.commands += n;
                if !args.summary && !global.quiet {
                    println!("{} {}", style("✓").green(), path.display());
                }
            }
            Err(e) => {
                stats.files_failed += 1;
                if !args.summary {
                    println!("{} {} - {}", style("✗").red(), path.display(), describe(&e));
                }
                if first_error.is_none() {
                    first_error = Some(e);
                }
                if args.fail_fast {
                    break;
                }
            }
        }
    }

    if !global.quiet {
        println!();
        println!("{}", style("─".repeat(60)).dim());
        println!("{}", style("Check Summary").bold());
        println!("{}", style("─".repeat(60)).dim());
        println!("  Files checked:  {}", style(stats.files_checked).cyan());
        println!("  Files passed:   {}", style(stats.files_passed).green());
        println!("  Files failed:   {}", style(stats.files_failed).red());
        println!("  Commands run:   {}", style(stats.commands).cyan());
        println!();
    }

    match first_error {
        Some(e) if stats.files_failed == 1 => Err(e.wrap_err("Check failed: 1 file has errors")),
        Some(e) => Err(e.wrap_err(format!(
            "Check failed: {} files have errors",
            stats.files_failed
        ))),
        None => {
            if !global.quiet {
                println!("{} All scripts passed!", style("✓").green().bold());
            }
            Ok(())
        }
    }
}

/// Parse and dry-run one script, returning the number of commands executed
fn check_one(config: &Config, path: &Path) -> Result<usize> {
    let script = Script::load(path)?;
    let mut session = Session::with_console(config, Box::new(std::io::sink()));
    Ok(script::run(&mut session, &script, Mode::Check)?)
}

/// One-line rendering of an error and its causes
fn describe(err: &miette::Report) -> String {
    err.chain()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}
