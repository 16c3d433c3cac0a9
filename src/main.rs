//! The Benten command line tool.

use std::io::IsTerminal;
use std::io::stderr;

use benten::commands;
use clap::Parser;
use clap::Subcommand;
use clap_verbosity_flag::Verbosity;
use colored::Colorize;
use tracing_log::AsTrace;

/// The benten subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Checks CWL documents and reports diagnostics.
    Check(commands::check::CheckArgs),

    /// Prints the symbol outline of a CWL document.
    Symbols(commands::symbols::SymbolsArgs),
}

/// Language intelligence for Common Workflow Language documents.
#[derive(Parser)]
#[command(author, version, propagate_version = true, about, long_about = None)]
struct Cli {
    /// The subcommand to run.
    #[command(subcommand)]
    command: Commands,

    /// The verbosity flags.
    #[command(flatten)]
    verbose: Verbosity,
}

/// Parses the command line and runs the selected subcommand.
fn inner() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_log::LogTracer::init()?;

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_max_level(cli.verbose.log_level_filter().as_trace())
        .with_writer(std::io::stderr)
        .with_ansi(stderr().is_terminal())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Check(args) => commands::check::check(args),
        Commands::Symbols(args) => commands::symbols::symbols(args),
    }
}

fn main() {
    if let Err(e) = inner() {
        eprintln!(
            "{error}: {e:?}",
            error = if std::io::stderr().is_terminal() {
                "error".red().bold()
            } else {
                "error".normal()
            }
        );
        std::process::exit(1);
    }
}
