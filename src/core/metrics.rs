//! Concrete similarity metrics and the canonical metric sequences.
//!
//! Each metric compares two [`MediaItem`]s through its own lens: parsed
//! season/episode numbers, air dates, titles, fuzzy name similarity,
//! file attributes or series popularity. The broad metrics deliberately
//! quantize their scores into a few ranks so that a refinement pass
//! separates clear winners from noise instead of overfitting to tiny
//! similarity differences.

use crate::core::dates::DateParser;
use crate::core::metric::{MetricCascade, SimilarityMetric};
use crate::core::normalize::{normalize_name, remove_trailing_brackets, TextCache};
use crate::core::pattern::SeasonEpisodeParser;
use crate::core::sxe::{SxE, UNDEFINED};
use crate::models::media::{Episode, MediaItem};
use chrono::Utc;
use std::sync::Arc;

fn normalized(cache: &TextCache, item: &MediaItem) -> String {
    cache.normalized(&item.cache_key(), &item.name())
}

/// Season/episode numbers of every episode behind an item, including
/// absolute and special numbering variants.
fn episode_readings(episode: &Episode) -> Vec<SxE> {
    let mut readings = Vec::new();
    if let Some(ep) = episode.episode {
        let season = episode.season.map(|s| s as i32).unwrap_or(UNDEFINED);
        readings.push(SxE::new(season, ep as i32));
    }
    if let Some(absolute) = episode.absolute {
        readings.push(SxE::absolute(absolute as i32));
    }
    if let Some(special) = episode.special {
        readings.push(SxE::new(0, special as i32));
    }
    readings
}

/// Match by season/episode numbers.
pub struct SeasonEpisodeMetric {
    parser: SeasonEpisodeParser,
    cache: Arc<TextCache>,
}

impl SeasonEpisodeMetric {
    pub fn new(cache: Arc<TextCache>) -> Self {
        Self {
            parser: SeasonEpisodeParser::default(),
            cache,
        }
    }

    /// Variant that only trusts explicit patterns in file names.
    pub fn strict(cache: Arc<TextCache>) -> Self {
        Self {
            parser: SeasonEpisodeParser::strict(),
            cache,
        }
    }

    fn parse(&self, item: &MediaItem) -> Vec<SxE> {
        match item {
            MediaItem::Episode(e) => episode_readings(e),
            MediaItem::MultiEpisode(m) => {
                let mut readings = Vec::new();
                for e in &m.episodes {
                    for sxe in episode_readings(e) {
                        if !readings.contains(&sxe) {
                            readings.push(sxe);
                        }
                    }
                }
                readings
            }
            MediaItem::File(f) => {
                let path = f.path.clone();
                self.cache
                    .numbers_or_insert_with(&item.cache_key(), || self.parser.parse_path(&path))
            }
            MediaItem::Text(s) => self
                .cache
                .numbers_or_insert_with(&item.cache_key(), || self.parser.parse(s)),
            MediaItem::Movie(_) | MediaItem::MoviePart(_) | MediaItem::AudioTrack(_) => Vec::new(),
        }
    }

    fn pair_score(a: &SxE, b: &SxE) -> f32 {
        if a == b {
            return 1.0;
        }
        // one field agrees while the other differs, half credit
        if (a.has_season() && a.season == b.season)
            || (a.has_episode() && a.episode == b.episode)
        {
            return 0.5;
        }
        0.0
    }
}

impl SimilarityMetric for SeasonEpisodeMetric {
    fn similarity(&self, a: &MediaItem, b: &MediaItem) -> f32 {
        let left = self.parse(a);
        let right = self.parse(b);
        if left.is_empty() || right.is_empty() {
            return 0.0;
        }
        let mut max = 0.0f32;
        for x in &left {
            for y in &right {
                max = max.max(Self::pair_score(x, y));
            }
        }
        max
    }
}

/// Match by episode air date.
pub struct AirDateMetric {
    parser: DateParser,
    cache: Arc<TextCache>,
}

impl AirDateMetric {
    pub fn new(cache: Arc<TextCache>) -> Self {
        Self {
            parser: DateParser::new(),
            cache,
        }
    }

    fn parse(&self, item: &MediaItem) -> Option<chrono::NaiveDate> {
        match item {
            MediaItem::Episode(e) => e.airdate,
            MediaItem::MultiEpisode(m) => m.episodes.first().and_then(|e| e.airdate),
            MediaItem::File(f) => {
                let name = f.name();
                self.cache
                    .date_or_insert_with(&item.cache_key(), || self.parser.parse(&name))
            }
            MediaItem::Text(s) => self
                .cache
                .date_or_insert_with(&item.cache_key(), || self.parser.parse(s)),
            MediaItem::Movie(_) | MediaItem::MoviePart(_) | MediaItem::AudioTrack(_) => None,
        }
    }
}

impl SimilarityMetric for AirDateMetric {
    fn similarity(&self, a: &MediaItem, b: &MediaItem) -> f32 {
        match (self.parse(a), self.parse(b)) {
            (Some(x), Some(y)) if x == y => 1.0,
            _ => 0.0,
        }
    }
}

/// Match by episode/movie title substring containment.
pub struct TitleMetric {
    cache: Arc<TextCache>,
}

impl TitleMetric {
    pub fn new(cache: Arc<TextCache>) -> Self {
        Self { cache }
    }

    fn title_of(&self, episode: &Episode) -> Option<String> {
        let title = episode.title.as_deref()?;
        let token = normalize_name(&remove_trailing_brackets(title));
        // a title that repeats the series name carries no signal
        if token.len() >= 4 && !normalize_name(&episode.series_name).contains(&token) {
            Some(token)
        } else {
            None
        }
    }

    fn normalize(&self, item: &MediaItem) -> Option<String> {
        match item {
            MediaItem::Episode(e) => self.title_of(e),
            MediaItem::MultiEpisode(m) => m.episodes.first().and_then(|e| self.title_of(e)),
            MediaItem::Movie(m) => Some(normalize_name(&m.name)),
            other => {
                let s = normalized(&self.cache, other);
                // short strings produce too many false positives
                if s.len() >= 4 {
                    Some(s)
                } else {
                    None
                }
            }
        }
    }
}

impl SimilarityMetric for TitleMetric {
    fn similarity(&self, a: &MediaItem, b: &MediaItem) -> f32 {
        match (self.normalize(a), self.normalize(b)) {
            (Some(x), Some(y)) if !x.is_empty() && !y.is_empty() => {
                if x.contains(&y) || y.contains(&x) {
                    1.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }
}

/// Match series/episode titles against the folder structure and file
/// name, averaging containment over all field pairs.
pub struct SubstringFieldsMetric {
    cache: Arc<TextCache>,
}

impl SubstringFieldsMetric {
    pub fn new(cache: Arc<TextCache>) -> Self {
        Self { cache }
    }

    fn fields(&self, item: &MediaItem) -> Vec<String> {
        let raw: Vec<String> = match item {
            MediaItem::Episode(e) => episode_fields(e),
            MediaItem::MultiEpisode(m) => {
                m.episodes.iter().flat_map(episode_fields).collect()
            }
            MediaItem::File(f) => {
                let mut fields = Vec::new();
                if let Some(parent) = f.parent() {
                    fields.push(parent);
                }
                fields.push(f.name());
                fields
            }
            MediaItem::Movie(m) => {
                let mut fields = vec![m.name.clone()];
                if let Some(year) = m.year {
                    fields.push(year.to_string());
                }
                fields
            }
            other => vec![other.name()],
        };

        let mut fields = Vec::new();
        for field in raw {
            let n = normalize_name(&field);
            if !n.is_empty() && !fields.contains(&n) {
                fields.push(n);
            }
        }
        fields.truncate(5);
        fields
    }
}

fn episode_fields(e: &Episode) -> Vec<String> {
    let mut fields = vec![e.series_name.clone()];
    if let Some(title) = &e.title {
        fields.push(remove_trailing_brackets(title));
    }
    fields.extend(e.aliases.iter().cloned());
    fields
}

impl SimilarityMetric for SubstringFieldsMetric {
    fn similarity(&self, a: &MediaItem, b: &MediaItem) -> f32 {
        let left = self.fields(a);
        let right = self.fields(b);
        if left.is_empty() || right.is_empty() {
            return 0.0;
        }
        let mut sum = 0.0f32;
        for x in &left {
            for y in &right {
                if x.contains(y.as_str()) || y.contains(x.as_str()) {
                    sum += 1.0;
                }
            }
        }
        sum /= (left.len() * right.len()) as f32;
        // quantize into 3 similarity levels
        (sum * 3.0).ceil() / 3.0
    }
}

/// Bigram similarity of two strings, with an exact-match fast path.
fn dice(a: &str, b: &str) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    strsim::sorensen_dice(a, b) as f32
}

/// Generic fuzzy name similarity over the full normalized names.
pub struct NameMetric {
    cache: Arc<TextCache>,
    rounded: bool,
}

impl NameMetric {
    pub fn new(cache: Arc<TextCache>) -> Self {
        Self {
            cache,
            rounded: false,
        }
    }

    /// Variant quantized into 4 ranks, used early in a sequence where
    /// small similarity differences are still meaningless.
    pub fn rounded(cache: Arc<TextCache>) -> Self {
        Self {
            cache,
            rounded: true,
        }
    }
}

impl SimilarityMetric for NameMetric {
    fn similarity(&self, a: &MediaItem, b: &MediaItem) -> f32 {
        let score = dice(&normalized(&self.cache, a), &normalized(&self.cache, b));
        if self.rounded {
            (score * 4.0).floor() / 4.0
        } else {
            score
        }
    }
}

/// Fuzzy similarity between known series names (including aliases) and
/// the components of a file path.
pub struct SeriesNameMetric {
    cache: Arc<TextCache>,
}

impl SeriesNameMetric {
    pub fn new(cache: Arc<TextCache>) -> Self {
        Self { cache }
    }

    fn identifiers(&self, item: &MediaItem) -> Vec<String> {
        let raw: Vec<String> = match item {
            MediaItem::Episode(e) => e.series_names().iter().map(|s| s.to_string()).collect(),
            MediaItem::MultiEpisode(m) => m
                .episodes
                .iter()
                .flat_map(|e| e.series_names().iter().map(|s| s.to_string()).collect::<Vec<_>>())
                .collect(),
            MediaItem::File(f) => f.path_tail(3),
            _ => Vec::new(),
        };
        raw.iter()
            .map(|s| self.cache.normalized(s, s))
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl SimilarityMetric for SeriesNameMetric {
    fn similarity(&self, a: &MediaItem, b: &MediaItem) -> f32 {
        let left = self.identifiers(a);
        let right = self.identifiers(b);
        let mut max = 0.0f32;
        for x in &left {
            for y in &right {
                max = max.max(dice(x, y));
            }
        }
        // quantize into 4 ranks
        (max * 4.0).floor() / 4.0
    }
}

/// Generic numeric similarity over the digit tokens of each field.
pub struct NumericMetric {
    cache: Arc<TextCache>,
}

impl NumericMetric {
    pub fn new(cache: Arc<TextCache>) -> Self {
        Self { cache }
    }

    fn fields(&self, item: &MediaItem) -> Vec<String> {
        match item {
            MediaItem::Episode(e) => {
                let mut fields = vec![e.series_name.clone()];
                fields.push(match e.special {
                    Some(special) => special.to_string(),
                    None => e.format_numbers(),
                });
                if let Some(absolute) = e.absolute {
                    fields.push(absolute.to_string());
                }
                fields
            }
            MediaItem::MultiEpisode(m) => m.episodes.iter().map(|e| e.format_numbers()).collect(),
            MediaItem::Movie(movie) => {
                let mut fields = vec![movie.name.clone()];
                if let Some(year) = movie.year {
                    fields.push(year.to_string());
                }
                fields
            }
            other => vec![normalized(&self.cache, other)],
        }
    }
}

/// Digit tokens of a string with leading zeros dropped, joined for
/// bigram comparison.
fn digit_tokens(text: &str) -> String {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|t| !t.is_empty())
        .filter_map(|t| t.parse::<u64>().ok())
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

impl SimilarityMetric for NumericMetric {
    fn similarity(&self, a: &MediaItem, b: &MediaItem) -> f32 {
        let mut max = 0.0f32;
        for x in self.fields(a) {
            for y in self.fields(b) {
                let score = dice(&digit_tokens(&x), &digit_tokens(&y));
                max = max.max(score);
                if max >= 1.0 {
                    return max;
                }
            }
        }
        max
    }
}

/// Match by file length. Only meaningful when both sides carry sizes.
pub struct FileSizeMetric;

impl FileSizeMetric {
    fn length(item: &MediaItem) -> u64 {
        match item {
            MediaItem::File(f) => f.size.unwrap_or(0),
            _ => 0,
        }
    }
}

impl SimilarityMetric for FileSizeMetric {
    fn similarity(&self, a: &MediaItem, b: &MediaItem) -> f32 {
        let (x, y) = (Self::length(a), Self::length(b));
        if x > 0 && x == y {
            1.0
        } else {
            0.0
        }
    }
}

/// Prefer files whose modification time sits close to the air date.
pub struct TimeStampMetric;

impl TimeStampMetric {
    fn timestamp(item: &MediaItem) -> Option<i64> {
        match item {
            MediaItem::File(f) => f.modified.map(|m| m.timestamp()).filter(|&ts| ts > 0),
            MediaItem::Episode(e) => episode_timestamp(e),
            MediaItem::MultiEpisode(m) => m.episodes.first().and_then(episode_timestamp),
            _ => None,
        }
    }
}

fn episode_timestamp(e: &Episode) -> Option<i64> {
    let ts = e.airdate?.and_hms_opt(0, 0, 0)?.and_utc().timestamp();
    // penalize episodes that have not aired yet
    if ts <= 0 || ts > Utc::now().timestamp() {
        return None;
    }
    Some(ts)
}

impl SimilarityMetric for TimeStampMetric {
    fn similarity(&self, a: &MediaItem, b: &MediaItem) -> f32 {
        match (Self::timestamp(a), Self::timestamp(b)) {
            (Some(x), Some(y)) => {
                let ratio = x.min(y) as f64 / x.max(y) as f64;
                if ratio >= 0.8 {
                    1.0
                } else {
                    0.0
                }
            }
            _ => -1.0,
        }
    }
}

/// Boost popular series, penalize series nobody has rated.
pub struct SeriesRatingMetric;

impl SeriesRatingMetric {
    fn score(item: &MediaItem) -> f32 {
        let episode = match item {
            MediaItem::Episode(e) => e,
            MediaItem::MultiEpisode(m) => match m.episodes.first() {
                Some(e) => e,
                None => return 0.0,
            },
            _ => return 0.0,
        };
        if let Some(info) = &episode.series {
            if let (Some(rating), Some(count)) = (info.rating, info.rating_count) {
                if count >= 20 {
                    return (rating / 3.0).floor();
                }
                if count >= 1 {
                    return 0.0;
                }
                return -1.0;
            }
        }
        0.0
    }
}

impl SimilarityMetric for SeriesRatingMetric {
    fn similarity(&self, a: &MediaItem, b: &MediaItem) -> f32 {
        let (x, y) = (Self::score(a), Self::score(b));
        if x < 0.0 || y < 0.0 {
            return -1.0;
        }
        x.max(y)
    }
}

/// Weighs the season/episode identifier against the title signal.
///
/// An identifier match scores 1.1, so certain matches outrank every
/// plain metric. A title is only allowed to override a failed
/// identifier when the series name agrees as well.
pub struct EpisodeBalancerMetric {
    identifier: Arc<dyn SimilarityMetric>,
    title: Arc<TitleMetric>,
    series_name: Arc<SeriesNameMetric>,
}

impl EpisodeBalancerMetric {
    pub fn new(
        identifier: Arc<dyn SimilarityMetric>,
        title: Arc<TitleMetric>,
        series_name: Arc<SeriesNameMetric>,
    ) -> Self {
        Self {
            identifier,
            title,
            series_name,
        }
    }

    /// Series name plus episode title as one text blob, used to detect
    /// misleading episode-number patterns inside the title itself.
    fn title_item(item: &MediaItem) -> MediaItem {
        match item {
            MediaItem::Episode(e) => MediaItem::Text(format!(
                "{} {}",
                e.series_name,
                e.title.as_deref().unwrap_or_default()
            )),
            other => other.clone(),
        }
    }
}

impl SimilarityMetric for EpisodeBalancerMetric {
    fn similarity(&self, a: &MediaItem, b: &MediaItem) -> f32 {
        let mut sxe = self.identifier.similarity(a, b);
        let mut title = if sxe < 1.0 {
            self.title.similarity(a, b)
        } else {
            // an identifier match counts as a title match as well
            1.0
        };

        // misleading SxE patterns inside the episode title
        if sxe < 0.0
            && title == 1.0
            && self
                .identifier
                .similarity(&Self::title_item(a), &Self::title_item(b))
                == 1.0
        {
            sxe = 1.0;
            title = 0.0;
        }

        // title may only override SxE when the series name agrees too
        if title == 1.0 && self.series_name.similarity(a, b) < 0.5 {
            title = 0.0;
        }

        sxe.max(0.0) * title + sxe.floor() / 10.0
    }
}

/// Builds the metric catalogue over one shared normalization cache and
/// exposes the canonical refinement sequences.
pub struct MetricSet {
    season_episode: Arc<SeasonEpisodeMetric>,
    air_date: Arc<AirDateMetric>,
    title: Arc<TitleMetric>,
    substring_fields: Arc<SubstringFieldsMetric>,
    series_name: Arc<SeriesNameMetric>,
    name: Arc<NameMetric>,
    name_rounded: Arc<NameMetric>,
    numeric: Arc<NumericMetric>,
    series_rating: Arc<SeriesRatingMetric>,
    time_stamp: Arc<TimeStampMetric>,
    file_size: Arc<FileSizeMetric>,
    episode_funnel: Arc<MetricCascade>,
    episode_balancer: Arc<EpisodeBalancerMetric>,
    strict_identifier: Arc<MetricCascade>,
}

impl Default for MetricSet {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSet {
    pub fn new() -> Self {
        let cache = Arc::new(TextCache::new());

        let season_episode = Arc::new(SeasonEpisodeMetric::new(cache.clone()));
        let air_date = Arc::new(AirDateMetric::new(cache.clone()));
        let title = Arc::new(TitleMetric::new(cache.clone()));
        let substring_fields = Arc::new(SubstringFieldsMetric::new(cache.clone()));
        let series_name = Arc::new(SeriesNameMetric::new(cache.clone()));
        let name = Arc::new(NameMetric::new(cache.clone()));
        let name_rounded = Arc::new(NameMetric::rounded(cache.clone()));
        let numeric = Arc::new(NumericMetric::new(cache.clone()));

        let episode_identifier: Arc<dyn SimilarityMetric> = Arc::new(MetricCascade::new(vec![
            season_episode.clone(),
            air_date.clone(),
        ]));
        let episode_funnel = Arc::new(MetricCascade::new(vec![
            season_episode.clone(),
            air_date.clone(),
            title.clone(),
        ]));
        let episode_balancer = Arc::new(EpisodeBalancerMetric::new(
            episode_identifier,
            title.clone(),
            series_name.clone(),
        ));
        let strict_identifier = Arc::new(MetricCascade::new(vec![
            Arc::new(SeasonEpisodeMetric::strict(cache.clone())) as Arc<dyn SimilarityMetric>,
            air_date.clone(),
        ]));

        Self {
            season_episode,
            air_date,
            title,
            substring_fields,
            series_name,
            name,
            name_rounded,
            numeric,
            series_rating: Arc::new(SeriesRatingMetric),
            time_stamp: Arc::new(TimeStampMetric),
            file_size: Arc::new(FileSizeMetric),
            episode_funnel,
            episode_balancer,
            strict_identifier,
        }
    }

    /// Default refinement sequence for episode matching: divide by
    /// identifiers first, then folder/name evidence, then ever weaker
    /// tie-breakers.
    pub fn lenient_sequence(&self) -> Vec<Arc<dyn SimilarityMetric>> {
        vec![
            self.episode_funnel.clone(),
            self.episode_balancer.clone(),
            self.air_date.clone(),
            self.substring_fields.clone(),
            self.series_name.clone(),
            self.name_rounded.clone(),
            self.numeric.clone(),
            self.series_rating.clone(),
            self.time_stamp.clone(),
            self.name.clone(),
        ]
    }

    /// Lenient sequence with file metrics up front, for inputs where
    /// both sides are file-backed.
    pub fn lenient_sequence_with_file_metrics(&self) -> Vec<Arc<dyn SimilarityMetric>> {
        let mut sequence: Vec<Arc<dyn SimilarityMetric>> = vec![self.file_size.clone()];
        sequence.extend(self.lenient_sequence());
        sequence
    }

    /// Strict sequence: explicit identifiers and absolute name
    /// similarity only, no fuzzy fallbacks.
    pub fn strict_sequence(&self) -> Vec<Arc<dyn SimilarityMetric>> {
        vec![
            self.strict_identifier.clone(),
            self.numeric.clone(),
            self.name.clone(),
        ]
    }

    pub fn season_episode(&self) -> Arc<SeasonEpisodeMetric> {
        self.season_episode.clone()
    }

    pub fn title(&self) -> Arc<TitleMetric> {
        self.title.clone()
    }
}
