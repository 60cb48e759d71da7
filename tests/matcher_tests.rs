//! Integration tests for the episode matching engine.
//!
//! Tests cover:
//! - End-to-end matching of scanned files against an episode pool
//! - Mixed identifier styles resolved in one run
//! - Multi-episode folding with surplus candidates
//! - Strict mode
//! - Cancellation and result ordering

use media_matcher::core::matcher::{CancellationToken, EpisodeMatcher, Match};
use media_matcher::models::media::{Episode, FileRecord, MediaItem};
use media_matcher::utils::fs::scan_videos;
use media_matcher::Error;
use tempfile::TempDir;

// ========== TEST FIXTURES ==========

fn episode(season: u32, number: u32, title: &str) -> MediaItem {
    MediaItem::Episode(Episode {
        series_name: "Firefly".to_string(),
        season: Some(season),
        episode: Some(number),
        title: Some(title.to_string()),
        ..Default::default()
    })
}

fn file(path: &str) -> MediaItem {
    MediaItem::File(FileRecord::new(path))
}

fn episode_pool() -> Vec<MediaItem> {
    vec![
        episode(1, 1, "Serenity"),
        episode(1, 2, "The Train Job"),
        episode(1, 3, "Bushwhacked"),
        episode(1, 4, "Shindig"),
        episode(1, 5, "Safe"),
    ]
}

fn candidate_title(m: &Match) -> String {
    match &m.candidate {
        MediaItem::Episode(e) => e.title.clone().unwrap_or_default(),
        other => other.name(),
    }
}

// ========== END-TO-END MATCHING ==========

#[test]
fn test_mixed_identifier_styles() {
    // one file per identifier style, all resolved in a single run
    let files = vec![
        file("Firefly.S01E01.720p.HDTV.mkv"),
        file("Firefly.1x02.mkv"),
        file("Firefly.103.mkv"),
        file("Firefly Season 1 Episode 4.mkv"),
        file("Firefly.Part5.mkv"),
    ];

    let matcher = EpisodeMatcher::new(files, episode_pool(), false);
    let result = matcher.run(&CancellationToken::new()).unwrap();

    assert_eq!(result.matches.len(), 5);
    assert!(result.unmatched_files.is_empty());
    assert!(result.unmatched_episodes.is_empty());

    let titles: Vec<String> = result.matches.iter().map(candidate_title).collect();
    assert_eq!(
        titles,
        vec!["Serenity", "The Train Job", "Bushwhacked", "Shindig", "Safe"]
    );
}

#[test]
fn test_matching_scanned_directory() {
    let dir = TempDir::new().unwrap();
    for name in ["Firefly.S01E02.mkv", "Firefly.S01E01.mkv", "Firefly.S01E03.mkv"] {
        std::fs::write(dir.path().join(name), b"x").unwrap();
    }

    let files: Vec<MediaItem> = scan_videos(dir.path())
        .unwrap()
        .into_iter()
        .map(MediaItem::File)
        .collect();
    assert_eq!(files.len(), 3);

    let matcher = EpisodeMatcher::new(files, episode_pool(), false);
    let result = matcher.run(&CancellationToken::new()).unwrap();

    assert_eq!(result.matches.len(), 3);
    assert_eq!(result.unmatched_episodes.len(), 2);

    // scan order is by file name, matches follow it
    let titles: Vec<String> = result.matches.iter().map(candidate_title).collect();
    assert_eq!(titles, vec!["Serenity", "The Train Job", "Bushwhacked"]);
}

#[test]
fn test_identical_candidates_stay_distinct() {
    // two records with equal content are still two claimable slots
    let files = vec![
        file("/disk1/Firefly.S01E01.mkv"),
        file("/disk2/Firefly.S01E01.mkv"),
    ];
    let episodes = vec![episode(1, 1, "Serenity"), episode(1, 1, "Serenity")];

    let matcher = EpisodeMatcher::new(files, episodes, false);
    let result = matcher.run(&CancellationToken::new()).unwrap();

    assert_eq!(result.matches.len(), 2);
    assert!(result.unmatched_files.is_empty());
    assert!(result.unmatched_episodes.is_empty());
}

#[test]
fn test_surplus_files_stay_unmatched() {
    let files = vec![file("Firefly.S01E01.mkv"), file("Firefly.S01E09.mkv")];
    let matcher = EpisodeMatcher::new(files, vec![episode(1, 1, "Serenity")], false);
    let result = matcher.run(&CancellationToken::new()).unwrap();

    assert_eq!(result.matches.len(), 1);
    assert_eq!(candidate_title(&result.matches[0]), "Serenity");
    assert_eq!(result.unmatched_files.len(), 1);
    assert_eq!(result.unmatched_files[0].name(), "Firefly.S01E09");
}

// ========== MULTI-EPISODE FOLDING ==========

#[test]
fn test_multi_episode_folding_with_surplus_candidates() {
    // the double episode folds even with a third candidate in the pool
    let files = vec![file("Firefly.S01E01-02.mkv")];
    let episodes = vec![
        episode(1, 1, "Serenity"),
        episode(1, 2, "The Train Job"),
        episode(1, 3, "Bushwhacked"),
    ];

    let matcher = EpisodeMatcher::new(files, episodes, false);
    let result = matcher.run(&CancellationToken::new()).unwrap();

    assert_eq!(result.matches.len(), 1);
    match &result.matches[0].candidate {
        MediaItem::MultiEpisode(multi) => {
            assert_eq!(multi.episodes.len(), 2);
            assert_eq!(multi.episodes[0].episode, Some(1));
            assert_eq!(multi.episodes[1].episode, Some(2));
        }
        other => panic!("expected a multi-episode match, got {}", other),
    }
    assert_eq!(result.unmatched_episodes.len(), 1);
}

#[test]
fn test_non_consecutive_episodes_do_not_fold() {
    let files = vec![file("Firefly.S01E01-02.mkv")];
    let episodes = vec![episode(1, 1, "Serenity"), episode(1, 3, "Bushwhacked")];

    let matcher = EpisodeMatcher::new(files, episodes, false);
    let result = matcher.run(&CancellationToken::new()).unwrap();

    assert!(result
        .matches
        .iter()
        .all(|m| !matches!(m.candidate, MediaItem::MultiEpisode(_))));
}

// ========== STRICT MODE ==========

#[test]
fn test_strict_mode_matches_explicit_identifiers() {
    let files = vec![file("Firefly.S01E03.mkv"), file("Firefly.1x05.mkv")];
    let matcher = EpisodeMatcher::new(files, episode_pool(), true);
    let result = matcher.run(&CancellationToken::new()).unwrap();

    assert_eq!(result.matches.len(), 2);
    let titles: Vec<String> = result.matches.iter().map(candidate_title).collect();
    assert_eq!(titles, vec!["Bushwhacked", "Safe"]);
}

// ========== CANCELLATION ==========

#[test]
fn test_cancelled_run_returns_no_partial_result() {
    let token = CancellationToken::new();
    token.cancel();

    let mut matcher = EpisodeMatcher::new(
        vec![file("Firefly.S01E01.mkv")],
        vec![episode(1, 1, "Serenity")],
        false,
    );
    assert!(matches!(matcher.matches(&token), Err(Error::Cancelled)));
}
