use clap::Parser;
use miette::Result;
use slat::cli::{Cli, Commands, GlobalOpts};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping recorder output to `head` panics on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_tracing(&global);

    match cli.command {
        Commands::Run(args) => slat::cli::commands::run::run(args, &global),
        Commands::Check(args) => slat::cli::commands::check::run(args, &global),
        Commands::List(args) => slat::cli::commands::list::run(args, &global),
        Commands::Completions(args) => slat::cli::commands::completions::run(args),
    }
}

/// Log to stderr; RUST_LOG wins over the verbosity flags
fn init_tracing(global: &GlobalOpts) {
    let default = if global.quiet {
        "slat=error"
    } else if global.verbose {
        "slat=info"
    } else {
        "slat=warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
