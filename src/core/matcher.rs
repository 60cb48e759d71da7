//! The recursive match refinement engine.
//!
//! Matching starts from the full value/candidate cross product and
//! refines it one metric at a time: pairs are bucketed by similarity,
//! pairs that are unambiguous within their bucket are committed, pairs
//! conflicting with committed ones are discarded, and whatever is still
//! ambiguous recurses into the next metric. When the metrics run out the
//! remaining pairs are committed first come, first served.
//!
//! Committed matches are strictly disjoint: each value and each
//! candidate is claimed at most once per run. Identity is positional
//! (index into the input lists), so structurally equal records remain
//! distinct items.

use crate::core::metric::SimilarityMetric;
use crate::core::metrics::MetricSet;
use crate::core::pattern::SeasonEpisodeParser;
use crate::core::sxe::SxE;
use crate::error::{Error, Result};
use crate::models::media::{Episode, MediaItem, MultiEpisode};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Cooperative cancellation flag, clonable across threads.
///
/// A cancelled matcher run aborts with [`Error::Cancelled`]; it never
/// returns a partial result.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// A committed value/candidate pairing.
#[derive(Debug, Clone, Serialize)]
pub struct Match {
    pub value: MediaItem,
    pub candidate: MediaItem,
}

/// Index-based pairing used during refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pair {
    value: usize,
    candidate: usize,
}

enum CandidateRef {
    /// A candidate from the input list.
    Index(usize),
    /// A synthesized candidate (multi-episode) claiming several inputs.
    Folded(MediaItem),
}

struct CommittedMatch {
    value: usize,
    candidate: CandidateRef,
}

/// Accumulator for committed matches with O(1) claim checks per side.
struct DisjointMatchCollection {
    matches: Vec<CommittedMatch>,
    value_match: Vec<Option<usize>>,
    candidate_claimed: Vec<bool>,
}

impl DisjointMatchCollection {
    fn new(values: usize, candidates: usize) -> Self {
        Self {
            matches: Vec::new(),
            value_match: vec![None; values],
            candidate_claimed: vec![false; candidates],
        }
    }

    /// True while neither side of the pair has been claimed.
    fn disjoint(&self, pair: &Pair) -> bool {
        self.value_match[pair.value].is_none() && !self.candidate_claimed[pair.candidate]
    }

    /// Commit a pair unless it conflicts with an earlier commitment.
    fn add(&mut self, pair: Pair) -> bool {
        if !self.disjoint(&pair) {
            return false;
        }
        self.value_match[pair.value] = Some(self.matches.len());
        self.candidate_claimed[pair.candidate] = true;
        self.matches.push(CommittedMatch {
            value: pair.value,
            candidate: CandidateRef::Index(pair.candidate),
        });
        true
    }

    /// Commit a synthesized candidate claiming several input candidates.
    fn add_folded(&mut self, value: usize, candidate: MediaItem, claimed: &[usize]) -> bool {
        if self.value_match[value].is_some() || claimed.iter().any(|&c| self.candidate_claimed[c])
        {
            return false;
        }
        self.value_match[value] = Some(self.matches.len());
        for &c in claimed {
            self.candidate_claimed[c] = true;
        }
        self.matches.push(CommittedMatch {
            value,
            candidate: CandidateRef::Folded(candidate),
        });
        true
    }

    fn match_for_value(&self, value: usize) -> Option<&CommittedMatch> {
        self.value_match[value].map(|i| &self.matches[i])
    }

    fn is_value_claimed(&self, value: usize) -> bool {
        self.value_match[value].is_some()
    }

    fn is_candidate_claimed(&self, candidate: usize) -> bool {
        self.candidate_claimed[candidate]
    }
}

/// State for multi-episode folding: parsed file identifier sets, keyed
/// by value index.
struct FoldingState {
    parser: SeasonEpisodeParser,
    ids: HashMap<usize, BTreeSet<i32>>,
}

impl FoldingState {
    fn new() -> Self {
        Self {
            parser: SeasonEpisodeParser::default(),
            ids: HashMap::new(),
        }
    }
}

/// Matches values against candidates over a prioritized metric sequence.
///
/// An instance can be re-run: matched items are removed from the
/// internal lists, so a second call matches the remainders (typically
/// against a fresh candidate pool merged in by the caller).
pub struct Matcher {
    values: Vec<MediaItem>,
    candidates: Vec<MediaItem>,
    metrics: Vec<Arc<dyn SimilarityMetric>>,
    folding: Option<FoldingState>,
    collection: DisjointMatchCollection,
}

impl Matcher {
    pub fn new(
        values: Vec<MediaItem>,
        candidates: Vec<MediaItem>,
        metrics: Vec<Arc<dyn SimilarityMetric>>,
    ) -> Self {
        Self {
            collection: DisjointMatchCollection::new(values.len(), candidates.len()),
            values,
            candidates,
            metrics,
            folding: None,
        }
    }

    /// Enable committing one value to a consecutive run of episode
    /// candidates when the value's parsed numbers cover them exactly.
    pub fn with_multi_episode_folding(mut self) -> Self {
        self.folding = Some(FoldingState::new());
        self
    }

    /// Values not claimed by any committed match so far.
    pub fn remaining_values(&self) -> &[MediaItem] {
        &self.values
    }

    /// Candidates not claimed by any committed match so far.
    pub fn remaining_candidates(&self) -> &[MediaItem] {
        &self.candidates
    }

    /// Run the refinement and return the committed matches in input
    /// value order. Matched items are removed from the internal lists.
    pub fn matches(&mut self, cancel: &CancellationToken) -> Result<Vec<Match>> {
        self.collection = DisjointMatchCollection::new(self.values.len(), self.candidates.len());

        let mut pairs = Vec::with_capacity(self.values.len() * self.candidates.len());
        for value in 0..self.values.len() {
            for candidate in 0..self.candidates.len() {
                pairs.push(Pair { value, candidate });
            }
        }

        self.deep_match(pairs, 0, cancel)?;

        let mut result = Vec::new();
        for value in 0..self.values.len() {
            if let Some(committed) = self.collection.match_for_value(value) {
                let candidate = match &committed.candidate {
                    CandidateRef::Index(c) => self.candidates[*c].clone(),
                    CandidateRef::Folded(item) => item.clone(),
                };
                result.push(Match {
                    value: self.values[value].clone(),
                    candidate,
                });
            }
        }
        debug!(
            matched = result.len(),
            values = self.values.len(),
            candidates = self.candidates.len(),
            "match refinement finished"
        );

        // keep only the remainders so the matcher can be re-run
        let mut value_index = 0;
        let collection = &self.collection;
        self.values.retain(|_| {
            let keep = !collection.is_value_claimed(value_index);
            value_index += 1;
            keep
        });
        let mut candidate_index = 0;
        self.candidates.retain(|_| {
            let keep = !collection.is_candidate_claimed(candidate_index);
            candidate_index += 1;
            keep
        });
        if let Some(folding) = &mut self.folding {
            folding.ids.clear();
        }
        self.collection = DisjointMatchCollection::new(self.values.len(), self.candidates.len());

        Ok(result)
    }

    fn deep_match(&mut self, pairs: Vec<Pair>, level: usize, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if level >= self.metrics.len() || pairs.is_empty() {
            // no more metrics to differentiate by, commit as is
            for pair in pairs {
                self.collection.add(pair);
            }
            return Ok(());
        }

        let mut pairs = pairs;
        if let Some(mut folding) = self.folding.take() {
            pairs = self.fold_multi_episodes(&mut folding, pairs);
            self.folding = Some(folding);
        }

        for bucket in self.map_by_similarity(&pairs, level, cancel)? {
            // commit pairs that are unambiguous within their bucket
            let mut value_count: HashMap<usize, usize> = HashMap::new();
            let mut candidate_count: HashMap<usize, usize> = HashMap::new();
            for pair in &bucket {
                *value_count.entry(pair.value).or_default() += 1;
                *candidate_count.entry(pair.candidate).or_default() += 1;
            }
            let mut ambiguous = Vec::new();
            for pair in bucket {
                if value_count[&pair.value] == 1 && candidate_count[&pair.candidate] == 1 {
                    self.collection.add(pair);
                } else {
                    ambiguous.push(pair);
                }
            }

            // discard conflicts, then distinguish the rest by the next metric
            ambiguous.retain(|pair| self.collection.disjoint(pair));
            if !ambiguous.is_empty() {
                self.deep_match(ambiguous, level + 1, cancel)?;
            }
        }
        Ok(())
    }

    /// Score all pairs with the metric at `level` and group them into
    /// buckets of equal similarity, best first. Pair order within a
    /// bucket follows the input order.
    fn map_by_similarity(
        &self,
        pairs: &[Pair],
        level: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<Pair>>> {
        let metric = &self.metrics[level];
        let mut scored: Vec<(f32, Pair)> = Vec::with_capacity(pairs.len());
        for &pair in pairs {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let score =
                metric.similarity(&self.values[pair.value], &self.candidates[pair.candidate]);
            scored.push((score, pair));
        }
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut buckets: Vec<(f32, Vec<Pair>)> = Vec::new();
        for (score, pair) in scored {
            match buckets.last_mut() {
                Some((s, bucket)) if s.total_cmp(&score).is_eq() => bucket.push(pair),
                _ => buckets.push((score, vec![pair])),
            }
        }
        Ok(buckets.into_iter().map(|(_, bucket)| bucket).collect())
    }

    /// Commit files whose parsed identifier set exactly covers a
    /// consecutive run of episode candidates, as one multi-episode
    /// match. Returns the pairs that are still unclaimed.
    fn fold_multi_episodes(&mut self, folding: &mut FoldingState, pairs: Vec<Pair>) -> Vec<Pair> {
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for pair in &pairs {
            if matches!(self.candidates[pair.candidate], MediaItem::Episode(_)) {
                groups.entry(pair.value).or_default().push(pair.candidate);
            }
        }

        let mut modified = false;
        for (value, episode_candidates) in groups {
            let file_ids = self.value_identifier_set(folding, value);
            if file_ids.len() < 2 {
                continue;
            }

            let episodes: Vec<(usize, &Episode)> = episode_candidates
                .iter()
                .filter_map(|&c| match &self.candidates[c] {
                    MediaItem::Episode(e) => Some((c, e)),
                    _ => None,
                })
                .collect();
            let episode_ids: BTreeSet<i32> = episodes
                .iter()
                .filter_map(|(_, e)| {
                    normalize_identifier(&SxE::new(
                        e.season.map(|s| s as i32).unwrap_or(crate::core::sxe::UNDEFINED),
                        e.episode.map(|n| n as i32).unwrap_or(crate::core::sxe::UNDEFINED),
                    ))
                })
                .collect();
            if episode_ids.len() < 2 || file_ids != episode_ids {
                continue;
            }
            if !is_consecutive_run(&episodes) {
                continue;
            }

            let claimed: Vec<usize> = episodes.iter().map(|(c, _)| *c).collect();
            let multi = MediaItem::MultiEpisode(MultiEpisode {
                episodes: episodes.into_iter().map(|(_, e)| e.clone()).collect(),
            });
            debug!(value, episodes = claimed.len(), "folded multi-episode match");
            if self.collection.add_folded(value, multi, &claimed) {
                modified = true;
            }
        }

        if modified {
            pairs
                .into_iter()
                .filter(|pair| self.collection.disjoint(pair))
                .collect()
        } else {
            pairs
        }
    }

    fn value_identifier_set(&self, folding: &mut FoldingState, value: usize) -> BTreeSet<i32> {
        if let Some(ids) = folding.ids.get(&value) {
            return ids.clone();
        }
        let numbers = match &self.values[value] {
            MediaItem::File(f) => folding.parser.parse_path(&f.path),
            MediaItem::Text(s) => folding.parser.parse(s),
            _ => Vec::new(),
        };
        let ids: BTreeSet<i32> = numbers.iter().filter_map(normalize_identifier).collect();
        folding.ids.insert(value, ids.clone());
        ids
    }
}

/// Collapse a season/episode pair into a single comparable number:
/// 1x01 and absolute 101 both map to 101.
fn normalize_identifier(sxe: &SxE) -> Option<i32> {
    if sxe.season > 0 && sxe.episode > 0 && sxe.episode < 100 {
        return Some(sxe.season * 100 + sxe.episode);
    }
    if !sxe.has_season() && sxe.episode > 0 {
        return Some(sxe.episode);
    }
    None
}

/// Episodes form a run: consecutive numbers within a single series.
fn is_consecutive_run(episodes: &[(usize, &Episode)]) -> bool {
    if episodes.len() < 2 {
        return false;
    }
    let mut previous: Option<u32> = None;
    for (_, episode) in episodes {
        let Some(number) = episode.episode else {
            return false;
        };
        if let Some(p) = previous {
            if number != p + 1 {
                return false;
            }
        }
        previous = Some(number);
    }
    let series = &episodes[0].1.series_name;
    episodes.iter().all(|(_, e)| &e.series_name == series)
}

/// Matches local files against an episode candidate pool using the
/// canonical metric sequences, with multi-episode folding enabled.
pub struct EpisodeMatcher {
    matcher: Matcher,
}

/// Outcome of a full episode matching run.
#[derive(Debug, Serialize)]
pub struct EpisodeMatchResult {
    pub matches: Vec<Match>,
    pub unmatched_files: Vec<MediaItem>,
    pub unmatched_episodes: Vec<MediaItem>,
}

impl EpisodeMatcher {
    pub fn new(files: Vec<MediaItem>, episodes: Vec<MediaItem>, strict: bool) -> Self {
        let metrics = MetricSet::new();
        let sequence = if strict {
            metrics.strict_sequence()
        } else {
            metrics.lenient_sequence()
        };
        Self {
            matcher: Matcher::new(files, episodes, sequence).with_multi_episode_folding(),
        }
    }

    pub fn matches(&mut self, cancel: &CancellationToken) -> Result<Vec<Match>> {
        self.matcher.matches(cancel)
    }

    /// Run once and split the outcome into matches and remainders.
    pub fn run(mut self, cancel: &CancellationToken) -> Result<EpisodeMatchResult> {
        let matches = self.matcher.matches(cancel)?;
        Ok(EpisodeMatchResult {
            matches,
            unmatched_files: self.matcher.values,
            unmatched_episodes: self.matcher.candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::media::FileRecord;

    fn file(path: &str) -> MediaItem {
        MediaItem::File(FileRecord::new(path))
    }

    fn episode(series: &str, season: u32, number: u32, title: &str) -> MediaItem {
        MediaItem::Episode(Episode {
            series_name: series.to_string(),
            season: Some(season),
            episode: Some(number),
            title: Some(title.to_string()),
            ..Default::default()
        })
    }

    fn lenient(files: Vec<MediaItem>, episodes: Vec<MediaItem>) -> Matcher {
        Matcher::new(files, episodes, MetricSet::new().lenient_sequence())
    }

    #[test]
    fn test_matches_by_identifier() {
        let mut matcher = lenient(
            vec![file("Firefly.S01E02.mkv"), file("Firefly.S01E01.mkv")],
            vec![
                episode("Firefly", 1, 1, "Serenity"),
                episode("Firefly", 1, 2, "The Train Job"),
            ],
        );
        let matches = matcher.matches(&CancellationToken::new()).unwrap();
        assert_eq!(matches.len(), 2);
        // results follow input value order
        assert_eq!(matches[0].value.name(), "Firefly.S01E02");
        assert_eq!(matches[0].candidate.name(), "Firefly - 1x02 - The Train Job");
        assert_eq!(matches[1].candidate.name(), "Firefly - 1x01 - Serenity");
    }

    #[test]
    fn test_disjoint_results() {
        // two files claim the same episode, only one can win
        let mut matcher = lenient(
            vec![file("Firefly.S01E01.mkv"), file("Firefly.1x01.mkv")],
            vec![episode("Firefly", 1, 1, "Serenity")],
        );
        let matches = matcher.matches(&CancellationToken::new()).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matcher.remaining_values().len(), 1);
        assert!(matcher.remaining_candidates().is_empty());
    }

    #[test]
    fn test_remainders_can_be_rematched() {
        let mut matcher = lenient(
            vec![file("Firefly.S01E01.mkv"), file("Firefly.S01E07.mkv")],
            vec![episode("Firefly", 1, 1, "Serenity")],
        );
        let first = matcher.matches(&CancellationToken::new()).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(matcher.remaining_values().len(), 1);

        // a second run over the remainders yields nothing new
        let second = matcher.matches(&CancellationToken::new()).unwrap();
        assert!(second.is_empty());
        assert_eq!(matcher.remaining_values().len(), 1);
    }

    #[test]
    fn test_metric_exhaustion_commits_as_is() {
        // indistinguishable pairs: an empty metric sequence commits the
        // cross product greedily, still disjoint
        let mut matcher = Matcher::new(
            vec![file("/a.mkv"), file("/b.mkv")],
            vec![
                episode("Show", 1, 1, "One"),
                episode("Show", 1, 2, "Two"),
            ],
            Vec::new(),
        );
        let matches = matcher.matches(&CancellationToken::new()).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].candidate.name(), "Show - 1x01 - One");
        assert_eq!(matches[1].candidate.name(), "Show - 1x02 - Two");
    }

    #[test]
    fn test_file_to_file_matching_by_size() {
        // matching freshly downloaded files against an already named set,
        // where the size comparison decides before any name similarity
        let sized = |path: &str, size: u64| {
            let mut record = FileRecord::new(path);
            record.size = Some(size);
            MediaItem::File(record)
        };
        let mut matcher = Matcher::new(
            vec![sized("/incoming/a.mkv", 700_000_000), sized("/incoming/b.mkv", 900_000_000)],
            vec![
                sized("/library/Firefly.S01E02.mkv", 900_000_000),
                sized("/library/Firefly.S01E01.mkv", 700_000_000),
            ],
            MetricSet::new().lenient_sequence_with_file_metrics(),
        );
        let matches = matcher.matches(&CancellationToken::new()).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].candidate.name(), "Firefly.S01E01");
        assert_eq!(matches[1].candidate.name(), "Firefly.S01E02");
    }

    #[test]
    fn test_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let mut matcher = lenient(
            vec![file("Firefly.S01E01.mkv")],
            vec![episode("Firefly", 1, 1, "Serenity")],
        );
        assert!(matches!(matcher.matches(&token), Err(Error::Cancelled)));
    }

    #[test]
    fn test_multi_episode_folding() {
        let mut matcher = EpisodeMatcher::new(
            vec![file("Firefly.S01E01-02.mkv")],
            vec![
                episode("Firefly", 1, 1, "Serenity"),
                episode("Firefly", 1, 2, "The Train Job"),
            ],
            false,
        );
        let matches = matcher.matches(&CancellationToken::new()).unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches!(&matches[0].candidate, MediaItem::MultiEpisode(m) if m.episodes.len() == 2));
    }

    #[test]
    fn test_folding_requires_consecutive_run() {
        // episodes 1 and 3 do not form a run, no fold happens
        let mut matcher = EpisodeMatcher::new(
            vec![file("Firefly.S01E01-02.mkv")],
            vec![
                episode("Firefly", 1, 1, "Serenity"),
                episode("Firefly", 1, 3, "Bushwhacked"),
            ],
            false,
        );
        let matches = matcher.matches(&CancellationToken::new()).unwrap();
        assert!(matches
            .iter()
            .all(|m| !matches!(m.candidate, MediaItem::MultiEpisode(_))));
    }
}
