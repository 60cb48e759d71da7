//! Command line argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Media Matcher - Match media files against episode metadata
#[derive(Parser, Debug)]
#[command(name = "media-matcher")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Match video files in a directory against an episode list
    Match {
        /// Directory containing the video files
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Path to the episode candidates JSON file
        #[arg(short, long, value_name = "CANDIDATES")]
        candidates: PathBuf,

        /// Only accept explicit identifier and air date matches
        #[arg(long)]
        strict: bool,

        /// Output path for the match result JSON
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Parse season/episode numbers from names
    Parse {
        /// Names to parse
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,

        /// Skip the numeric-only fallback patterns
        #[arg(long)]
        strict: bool,
    },
}
