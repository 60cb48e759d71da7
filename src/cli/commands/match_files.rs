//! Match command implementation.

use crate::core::matcher::{CancellationToken, EpisodeMatchResult, EpisodeMatcher};
use crate::models::media::{Episode, MediaItem};
use crate::utils::fs;
use crate::Result;
use colored::Colorize;
use std::path::Path;

/// Match video files in a directory against an episode candidate list.
pub fn match_files(
    dir: &Path,
    candidates: &Path,
    strict: bool,
    output: Option<&Path>,
) -> Result<()> {
    fs::ensure_directory(dir)?;

    let files: Vec<MediaItem> = fs::scan_videos(dir)?
        .into_iter()
        .map(MediaItem::File)
        .collect();
    if files.is_empty() {
        println!("No video files found in {}", dir.display());
        return Ok(());
    }

    let episodes = load_candidates(candidates)?;
    println!(
        "Matching {} files against {} episodes{}",
        files.len().to_string().bold(),
        episodes.len().to_string().bold(),
        if strict { " (strict)" } else { "" }
    );
    println!();

    let matcher = EpisodeMatcher::new(files, episodes, strict);
    let result = matcher.run(&CancellationToken::new())?;
    print_result(&result);

    if let Some(output) = output {
        let file = std::fs::File::create(output)?;
        serde_json::to_writer_pretty(file, &result)?;
        println!();
        println!("Result written to {}", output.display());
    }

    Ok(())
}

/// Load the episode candidate pool from a JSON file.
fn load_candidates(path: &Path) -> Result<Vec<MediaItem>> {
    if !path.exists() {
        return Err(crate::Error::PathNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let episodes: Vec<Episode> = serde_json::from_str(&content).map_err(|e| {
        crate::Error::InvalidCandidateFile(format!("{}: {}", path.display(), e))
    })?;
    Ok(episodes.into_iter().map(MediaItem::Episode).collect())
}

fn print_result(result: &EpisodeMatchResult) {
    for m in &result.matches {
        println!(
            "  {} {} {}",
            m.value.name().green(),
            "->".dimmed(),
            m.candidate.name()
        );
    }

    if !result.unmatched_files.is_empty() {
        println!();
        println!("{}", "Unmatched files:".yellow().bold());
        for file in &result.unmatched_files {
            println!("  {}", file.name().yellow());
        }
    }

    if !result.unmatched_episodes.is_empty() {
        println!();
        println!("{}", "Unmatched episodes:".dimmed());
        for episode in &result.unmatched_episodes {
            println!("  {}", episode.name().dimmed());
        }
    }
}
