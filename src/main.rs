//! Media Matcher CLI
//!
//! A command-line tool for matching local media files against episode
//! metadata using fuzzy similarity metrics.

use clap::Parser;
use media_matcher::cli::{
    args::{Cli, Commands},
    commands::{match_files, parse},
};

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run the appropriate command
    match cli.command {
        Commands::Match {
            dir,
            candidates,
            strict,
            output,
        } => {
            match_files::match_files(&dir, &candidates, strict, output.as_deref())?;
        }

        Commands::Parse { names, strict } => {
            parse::parse(&names, strict)?;
        }
    }

    Ok(())
}

/// Initialize the logging system.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("media_matcher=debug")
    } else {
        EnvFilter::new("media_matcher=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
