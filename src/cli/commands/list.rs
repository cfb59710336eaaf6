//! `slat list` command - show the entities a script defines

use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{escape_csv, load_config, truncate_str, ConfigOverrides};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::session::EntrySummary;
use crate::core::Session;
use crate::script::{self, Mode, Script};

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Script to list
    pub path: PathBuf,

    /// Only list entities of this kind (e.g. im, edp, compgroup)
    #[arg(long, short = 't')]
    pub kind: Option<String>,

    /// Show only the count
    #[arg(long)]
    pub count: bool,
}

pub fn run(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global, &ConfigOverrides::default());
    let script = Script::load(&args.path)?;
    let mut session = Session::with_console(&config, Box::new(std::io::sink()));
    script::run(&mut session, &script, Mode::Check)?;

    let entries: Vec<EntrySummary> = session
        .entries()
        .into_iter()
        .filter(|e| {
            args.kind
                .as_deref()
                .map_or(true, |k| e.kind.as_str().eq_ignore_ascii_case(k))
        })
        .collect();

    if args.count {
        println!("{}", entries.len());
        return Ok(());
    }

    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&entries).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Csv => {
            println!("kind,id,summary");
            for e in &entries {
                println!(
                    "{},{},{}",
                    e.kind,
                    escape_csv(&e.id),
                    escape_csv(&e.summary)
                );
            }
        }
        OutputFormat::Auto | OutputFormat::Text => {
            if entries.is_empty() {
                if !global.quiet {
                    println!("No entities defined in {}", args.path.display());
                }
                return Ok(());
            }
            let mut table = Builder::default();
            table.push_record(["Kind", "ID", "Summary"]);
            for e in &entries {
                table.push_record([
                    e.kind.to_string(),
                    e.id.clone(),
                    truncate_str(&e.summary, 60),
                ]);
            }
            println!("{}", table.build().with(Style::sharp()));
            if !global.quiet {
                println!("\n{} entit(ies) in {}", entries.len(), args.path.display());
            }
        }
    }

    Ok(())
}
