//! pdfstitch - Merge PDF documents and extract pages.

mod cli;
mod commands;

use clap::Parser;
use std::process;

use crate::cli::{Cli, Command};
use pdfstitch::error::PdfError;
use pdfstitch::output::OutputFormatter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        process::exit(err.exit_code());
    }
}

/// Route `log` output to stderr; `RUST_LOG` overrides the flag defaults.
fn init_logging(verbose: bool, quiet: bool) {
    let default_filter = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), PdfError> {
    let formatter = OutputFormatter::from_flags(cli.quiet, cli.verbose);

    match cli.command {
        Command::Count(args) => commands::count(&args, &formatter).await,
        Command::Extract(args) => {
            let config = args.to_config(cli.verbose, cli.quiet)?;
            commands::extract(&config, &formatter).await
        }
        Command::Merge(args) => {
            let config = args.to_config(cli.verbose, cli.quiet)?;
            commands::merge(config, &formatter).await
        }
        Command::Library(args) => commands::library(args, &formatter).await,
    }
}
