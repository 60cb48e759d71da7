//! Season/episode number extraction from file and folder names.
//!
//! Recognizers are tried in a fixed priority order; the first family that
//! produces any sanity-accepted numbers wins and later families never
//! run. Explicit patterns like `S01E02` carry no numeric sanity filter
//! (high values such as `S12E345` are legal there), while ambiguous
//! numeric patterns are filtered so release years and resolutions do not
//! get mistaken for episode numbers.
//!
//! The regex engine has no look-around, so the boundary assertions are
//! done with explicit neighbor-character checks around each raw match.

use crate::core::dates::strip_dates;
use crate::core::normalize::{char_after, char_before, remove_embedded_checksum, strip_format_info};
use crate::core::sxe::{SeasonEpisodeFilter, SxE, UNDEFINED};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

static WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:season|series)[\W_]{0,3}(\d{1,4})[\W_]{0,3}episode[\W_]{0,3}(\d{1,4})")
        .unwrap()
});

static S00E00: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)s(\d{1,2}|\d{4})[\W_]{0,3}(?:ep|e|p)(\d{1,3})").unwrap());

static NXNN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d{1,2})x(\d{1,3})").unwrap());

static NXNN_HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?i)\d{1,2}x\d{1,3}").unwrap());

static DOTTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})\.(\d{2,3})").unwrap());

static EP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:(\d{2}|\d{4})[\W_]{0,3})?(?:episode|part|ep|e|p)[\W_]{0,3}(\d{1,3})")
        .unwrap()
});

static N_OF_M: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2})[\W_]{0,3}of[\W_]{0,3}\d{1,2}").unwrap());

static NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{2,6}").unwrap());

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").unwrap());

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{3}").unwrap());

static SEASON_FOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)season[-._ ]?(\d{1,4})").unwrap());

/// Extracts season/episode numbers from media file names.
#[derive(Debug, Clone)]
pub struct SeasonEpisodeParser {
    filter: SeasonEpisodeFilter,
    strict: bool,
}

impl Default for SeasonEpisodeParser {
    fn default() -> Self {
        Self::new(SeasonEpisodeFilter::DEFAULT, false)
    }
}

impl SeasonEpisodeParser {
    pub fn new(filter: SeasonEpisodeFilter, strict: bool) -> Self {
        Self { filter, strict }
    }

    /// Strict parser that only trusts explicit patterns.
    pub fn strict() -> Self {
        Self::new(SeasonEpisodeFilter::DEFAULT, true)
    }

    /// Extract all season/episode numbers from `name`.
    ///
    /// Returns the accepted numbers of the first recognizer family that
    /// yields any, or an empty vec. Never fails.
    pub fn parse(&self, name: &str) -> Vec<SxE> {
        // dates go before years so 2015.07.22 is not left as .07.22
        let text = remove_embedded_checksum(name);
        let text = strip_dates(&text);
        let text = self.strip_years(&text);
        let text = strip_format_info(&text);

        // explicit patterns carry no numeric sanity filter
        let families: [(&str, Vec<SxE>, Option<&SeasonEpisodeFilter>); 4] = [
            ("words", self.match_words(&text), None),
            ("s00e00", self.match_s00e00(&text), None),
            ("nxnn", self.match_nxnn(&text), Some(&self.filter)),
            ("dotted", self.match_dotted(&text), Some(&self.filter)),
        ];
        for (family, matches, filter) in families {
            let accepted = accept(matches, filter);
            if !accepted.is_empty() {
                debug!(family, ?accepted, "season/episode numbers recognized");
                return accepted;
            }
        }

        if !self.strict {
            let accepted = accept(self.match_union(&text), Some(&self.filter));
            if !accepted.is_empty() {
                debug!(family = "union", ?accepted, "season/episode numbers recognized");
                return accepted;
            }
            let accepted = self.match_digit_run(&text);
            if !accepted.is_empty() {
                debug!(family = "digit-run", ?accepted, "season/episode numbers recognized");
                return accepted;
            }
        }

        Vec::new()
    }

    /// Extract numbers for a file path: the file name first, then up to
    /// two parent folder names. Undefined seasons are filled in from a
    /// `Season <N>` folder along the path.
    pub fn parse_path(&self, path: &Path) -> Vec<SxE> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let folders: Vec<String> = path
            .ancestors()
            .skip(1)
            .take(2)
            .filter_map(|p| p.file_name())
            .map(|s| s.to_string_lossy().into_owned())
            .collect();

        let mut result = self.parse(&stem);
        if result.is_empty() {
            for folder in &folders {
                result = self.parse(folder);
                if !result.is_empty() {
                    break;
                }
            }
        }

        // Season folder convention: "Season 3/07.mkv" means 3x07
        if result.iter().any(|sxe| !sxe.has_season()) {
            if let Some(season) = folders.iter().find_map(|f| season_folder_number(f)) {
                for sxe in result.iter_mut() {
                    if !sxe.has_season() && sxe.has_episode() {
                        *sxe = SxE::regular(season, sxe.episode);
                    }
                }
                result = accept(result, None);
            }
        }

        result
    }

    /// `Season NN Episode NN` spelled out in words.
    fn match_words(&self, text: &str) -> Vec<SxE> {
        let mut out = Vec::new();
        scan(&WORDS, text, |caps, start, end| {
            if prev_not_alnum(text, start) && next_not_digit(text, end) {
                out.push(sxe_from(caps, 1, 2));
                Some(end)
            } else {
                None
            }
        });
        out
    }

    /// `S01E02` and friends, with trailing multi-episode numbers like
    /// `S01E01-02-03` or `s01e01e02` sharing the season.
    fn match_s00e00(&self, text: &str) -> Vec<SxE> {
        let mut out = Vec::new();
        scan(&S00E00, text, |caps, start, end| {
            if prev_not_alnum(text, start) && next_not_digit(text, end) {
                let sxe = sxe_from(caps, 1, 2);
                out.push(sxe);
                Some(trailing_s00e00(text, end, sxe.season, &mut out))
            } else {
                None
            }
        });
        out
    }

    /// `1x01` and friends, with trailing numbers like `1x01-02` or
    /// `1x01x02x03`.
    fn match_nxnn(&self, text: &str) -> Vec<SxE> {
        let mut out = Vec::new();
        scan(&NXNN, text, |caps, start, end| {
            if prev_not_alnum(text, start) && next_not_digit(text, end) {
                let sxe = sxe_from(caps, 1, 2);
                out.push(sxe);
                Some(trailing_nxnn(text, end, sxe.season, &mut out))
            } else {
                None
            }
        });
        out
    }

    /// Dotted `1.02` numbering. Rejected when the neighborhood makes it
    /// look like part of a date, e.g. `2015.07.22`.
    fn match_dotted(&self, text: &str) -> Vec<SxE> {
        let mut out = Vec::new();
        scan(&DOTTED, text, |caps, start, end| {
            let date_like_before = char_before(text, start) == Some('.')
                && start >= 2
                && char_before(text, start - 1).is_some_and(|c| c.is_ascii_digit());
            let date_like_after = char_after(text, end) == Some('.')
                && char_after(text, end + 1).is_some_and(|c| c.is_ascii_digit());
            if prev_not_alnum(text, start)
                && next_not_digit(text, end)
                && !date_like_before
                && !date_like_after
            {
                out.push(sxe_from(caps, 1, 2));
                Some(end)
            } else {
                None
            }
        });
        out
    }

    /// Combined low-priority recognizer: `Episode N`/`Part N` markers,
    /// `N of M` counts, then bare numeric tokens. Results concatenate in
    /// that order so explicit markers rank first.
    fn match_union(&self, text: &str) -> Vec<SxE> {
        let mut out = self.match_ep(text);
        out.extend(self.match_n_of_m(text));
        out.extend(self.match_numeric(text));
        out
    }

    fn match_ep(&self, text: &str) -> Vec<SxE> {
        let mut out = Vec::new();
        scan(&EP, text, |caps, start, end| {
            if prev_not_alnum(text, start) && next_not_digit(text, end) {
                out.push(sxe_from(caps, 1, 2));
                Some(end)
            } else {
                None
            }
        });
        out
    }

    fn match_n_of_m(&self, text: &str) -> Vec<SxE> {
        let mut out = Vec::new();
        scan(&N_OF_M, text, |caps, start, end| {
            if prev_not_alnum(text, start) && next_not_digit(text, end) {
                out.push(SxE::absolute(
                    caps.get(1).and_then(|m| m.as_str().parse().ok()).unwrap_or(UNDEFINED),
                ));
                Some(end)
            } else {
                None
            }
        });
        out
    }

    /// Bare numeric tokens enclosed in `.`/`_`/space boundaries, with
    /// dual interpretation: `101` reads as both 1x01 and absolute 101.
    fn match_numeric(&self, text: &str) -> Vec<SxE> {
        let mut out = Vec::new();
        scan(&NUMERIC, text, |caps, start, end| {
            let prev_ok = matches!(char_before(text, start), None | Some('.' | '_' | ' '));
            let next_ok = matches!(char_after(text, end), None | Some('.' | '_' | ' '));
            if prev_ok && next_ok {
                let token = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                out.extend(self.numeric_readings(token));
                Some(end)
            } else {
                None
            }
        });
        out
    }

    fn numeric_readings(&self, token: &str) -> Vec<SxE> {
        let mut readings = Vec::new();
        if token.len() >= 3 {
            let (season, episode) = token.split_at(token.len() - 2);
            readings.push(SxE::from_captures(Some(season), Some(episode)));
        }
        if let Ok(n) = token.parse::<i32>() {
            readings.push(SxE::absolute(n));
        }
        readings
    }

    /// Last resort: a 3-digit run embedded directly in other text, read
    /// as `(d)(dd)` under a tight filter. First acceptable hit wins.
    fn match_digit_run(&self, text: &str) -> Vec<SxE> {
        let mut out = Vec::new();
        scan(&DIGIT_RUN, text, |caps, start, end| {
            if out.is_empty() && prev_not_digit(text, start) {
                let token = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                let (season, episode) = token.split_at(1);
                let sxe = SxE::from_captures(Some(season), Some(episode));
                if SeasonEpisodeFilter::TIGHT.accept(&sxe) {
                    out.push(sxe);
                }
            }
            // keep scanning until something passes the tight filter
            if out.is_empty() {
                None
            } else {
                Some(end)
            }
        });
        out
    }

    /// Blank out 4-digit tokens that read as release years, unless they
    /// are glued to surrounding letters or digits like in `S2010E00`.
    fn strip_years(&self, text: &str) -> String {
        let mut stripped: Option<Vec<u8>> = None;
        scan(&YEAR, text, |caps, start, end| {
            let bounded = !char_before(text, start).is_some_and(|c| c.is_alphanumeric())
                && !char_after(text, end).is_some_and(|c| c.is_alphanumeric());
            let year = caps
                .get(0)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(UNDEFINED);
            if bounded && self.filter.in_year_window(year) {
                stripped
                    .get_or_insert_with(|| text.as_bytes().to_vec())[start..end]
                    .fill(b' ');
                Some(end)
            } else {
                None
            }
        });
        match stripped {
            Some(bytes) => String::from_utf8(bytes).unwrap_or_else(|_| text.to_string()),
            None => text.to_string(),
        }
    }
}

/// Season number from a `Season <N>` folder name.
fn season_folder_number(folder: &str) -> Option<i32> {
    SEASON_FOLDER
        .captures(folder)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Drive `pattern` over `text`. The callback sees each raw match with
/// absolute offsets and either returns the offset to resume from, or
/// `None` to reject the match and resume one character past its start.
fn scan<F>(pattern: &Regex, text: &str, mut on_match: F)
where
    F: FnMut(&regex::Captures<'_>, usize, usize) -> Option<usize>,
{
    let mut from = 0;
    while from < text.len() {
        let Some(caps) = pattern.captures(&text[from..]) else {
            break;
        };
        let whole = caps.get(0).unwrap();
        let (start, end) = (from + whole.start(), from + whole.end());
        match on_match(&caps, start, end) {
            Some(resume) => from = resume.max(start + 1),
            None => {
                let step = char_after(text, start).map(|c| c.len_utf8()).unwrap_or(1);
                from = start + step;
            }
        }
    }
}

fn sxe_from(caps: &regex::Captures<'_>, season_group: usize, episode_group: usize) -> SxE {
    SxE::from_captures(
        caps.get(season_group).map(|m| m.as_str()),
        caps.get(episode_group).map(|m| m.as_str()),
    )
}

fn prev_not_alnum(text: &str, idx: usize) -> bool {
    !char_before(text, idx).is_some_and(|c| c.is_alphanumeric())
}

fn prev_not_digit(text: &str, idx: usize) -> bool {
    !char_before(text, idx).is_some_and(|c| c.is_ascii_digit())
}

fn next_not_digit(text: &str, idx: usize) -> bool {
    !char_after(text, idx).is_some_and(|c| c.is_ascii_digit())
}

/// Consume trailing episode numbers after an `S01E01` head: an optional
/// `-` separator and/or another `e`/`ep`/`p` marker, then 1-3 digits.
/// Bare digits with neither separator nor marker never continue a run.
fn trailing_s00e00(text: &str, mut pos: usize, season: i32, out: &mut Vec<SxE>) -> usize {
    let bytes = text.as_bytes();
    loop {
        let mut p = pos;
        let mut separated = false;
        if p < bytes.len() && bytes[p] == b'-' {
            p += 1;
            separated = true;
        }
        if let Some(after_marker) = episode_marker(bytes, p) {
            p = after_marker;
            separated = true;
        }
        if !separated {
            return pos;
        }
        match take_digits(bytes, p, 3) {
            Some((number, after)) if !bytes.get(after).is_some_and(|b| b.is_ascii_digit()) => {
                out.push(SxE::new(season, number));
                pos = after;
            }
            _ => return pos,
        }
    }
}

/// Consume trailing episode numbers after a `1x01` head, joined by `-`
/// or another `x`. A `-` followed by a complete new `NxNN` head ends the
/// run so `03x11-03x12` reads as two heads, not one run.
fn trailing_nxnn(text: &str, mut pos: usize, season: i32, out: &mut Vec<SxE>) -> usize {
    let bytes = text.as_bytes();
    loop {
        let Some(&sep) = bytes.get(pos) else { return pos };
        if sep != b'-' && sep != b'x' && sep != b'X' {
            return pos;
        }
        let digit_start = pos + 1;
        if sep == b'-' && NXNN_HEAD.is_match(&text[digit_start.min(text.len())..]) {
            return pos;
        }
        match take_digits(bytes, digit_start, 3) {
            Some((number, after))
                if after - digit_start >= 2
                    && !bytes.get(after).is_some_and(|b| b.is_ascii_digit()) =>
            {
                out.push(SxE::new(season, number));
                pos = after;
            }
            _ => return pos,
        }
    }
}

/// Recognize an `e`/`ep`/`p` episode marker directly followed by a digit.
fn episode_marker(bytes: &[u8], p: usize) -> Option<usize> {
    let first = bytes.get(p)?.to_ascii_lowercase();
    if first != b'e' && first != b'p' {
        return None;
    }
    if first == b'e'
        && bytes.get(p + 1).map(u8::to_ascii_lowercase) == Some(b'p')
        && bytes.get(p + 2).is_some_and(|b| b.is_ascii_digit())
    {
        return Some(p + 2);
    }
    if bytes.get(p + 1).is_some_and(|b| b.is_ascii_digit()) {
        return Some(p + 1);
    }
    None
}

/// Up to `max` ASCII digits starting at `p`, parsed as a number.
fn take_digits(bytes: &[u8], p: usize, max: usize) -> Option<(i32, usize)> {
    let mut end = p;
    while end < bytes.len() && end - p < max && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == p {
        return None;
    }
    let number = std::str::from_utf8(&bytes[p..end]).ok()?.parse().ok()?;
    Some((number, end))
}

/// Apply the sanity filter and deduplicate, preserving first-seen order.
fn accept(matches: Vec<SxE>, filter: Option<&SeasonEpisodeFilter>) -> Vec<SxE> {
    let mut accepted: Vec<SxE> = Vec::with_capacity(matches.len());
    for sxe in matches {
        if filter.map_or(true, |f| f.accept(&sxe)) && !accepted.contains(&sxe) {
            accepted.push(sxe);
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parser() -> SeasonEpisodeParser {
        SeasonEpisodeParser::default()
    }

    #[test]
    fn test_s00e00() {
        assert_eq!(parser().parse("S01E01"), vec![SxE::regular(1, 1)]);
        assert_eq!(parser().parse("Show.Name.S01E02"), vec![SxE::regular(1, 2)]);
        assert_eq!(parser().parse("[s01]_[e03]"), vec![SxE::regular(1, 3)]);
        assert_eq!(parser().parse("S2010E00"), vec![SxE::regular(2010, 0)]);
        // explicit patterns bypass the sanity filter
        assert_eq!(
            parser().parse("Test - S12E345 - High Values"),
            vec![SxE::regular(12, 345)]
        );
    }

    #[test]
    fn test_s00e00_multiple() {
        assert_eq!(
            parser().parse("S01E01 and S01E02"),
            vec![SxE::regular(1, 1), SxE::regular(1, 2)]
        );
        assert_eq!(
            parser().parse("Test.42.s01e01.s01e02.300"),
            vec![SxE::regular(1, 1), SxE::regular(1, 2)]
        );
    }

    #[test]
    fn test_s00e00_multi_episode() {
        let expected: Vec<SxE> = (1..=4).map(|e| SxE::regular(1, e)).collect();
        assert_eq!(parser().parse("s01e01-02-03-04"), expected);
        assert_eq!(parser().parse("s01e01e02e03e04"), expected);
        assert_eq!(parser().parse("[s01]_[e01-02-03-04]"), expected);
    }

    #[test]
    fn test_nxnn() {
        assert_eq!(parser().parse("1x01"), vec![SxE::regular(1, 1)]);
        assert_eq!(parser().parse("Show Name 1x05"), vec![SxE::regular(1, 5)]);
        assert_eq!(
            parser().parse("Test - 1x01 and 1x02"),
            vec![SxE::regular(1, 1), SxE::regular(1, 2)]
        );
        // values beyond the sanity limits are rejected outright
        assert_eq!(parser().parse("Test - 12x345 - High Values"), vec![]);
    }

    #[test]
    fn test_nxnn_multi_episode() {
        let expected: Vec<SxE> = (1..=4).map(|e| SxE::regular(1, e)).collect();
        assert_eq!(parser().parse("1x01-02-03-04"), expected);
        assert_eq!(parser().parse("1x01x02x03x04"), expected);
        assert_eq!(parser().parse("1x01.1x02.1x03.1x04"), expected);
        assert_eq!(
            parser().parse("03x11-03x12-03x13-03x14"),
            vec![
                SxE::regular(3, 11),
                SxE::regular(3, 12),
                SxE::regular(3, 13),
                SxE::regular(3, 14)
            ]
        );
        assert_eq!(
            parser().parse("09x09-09x10"),
            vec![SxE::regular(9, 9), SxE::regular(9, 10)]
        );
    }

    #[test]
    fn test_pattern_precedence() {
        // S01E01 pattern has highest precedence
        assert_eq!(parser().parse("Test.101.1x02.S01E03")[0], SxE::regular(1, 3));
    }

    #[test]
    fn test_ep_markers() {
        assert_eq!(parser().parse("E16")[0], SxE::absolute(16));
        assert_eq!(parser().parse("Show.Name.E12"), vec![SxE::absolute(12)]);
        assert_eq!(parser().parse("wsop.2013.me.p11.720p-yestv")[0], SxE::absolute(11));
        assert_eq!(
            parser().parse("World.Series.Of.Poker.2013.Main.Event.Part18.480p.HDTV.x264-mSD")[0],
            SxE::absolute(18)
        );
        // a leading year token is release info, not a season number
        assert_eq!(parser().parse("2013.P10"), vec![SxE::absolute(10)]);
    }

    #[test]
    fn test_n_of_m() {
        assert_eq!(parser().parse("Documentaries.1of6"), vec![SxE::absolute(1)]);
    }

    #[test]
    fn test_union_order() {
        assert_eq!(
            parser().parse("alias.101.Part1"),
            vec![SxE::absolute(1), SxE::regular(1, 1), SxE::absolute(101)]
        );
    }

    #[test]
    fn test_numeric() {
        assert_eq!(
            parser().parse("Test.101"),
            vec![SxE::regular(1, 1), SxE::absolute(101)]
        );
        assert_eq!(parser().parse("103"), vec![SxE::regular(1, 3), SxE::absolute(103)]);
        assert_eq!(parser().parse("02"), vec![SxE::absolute(2)]);
        assert_eq!(parser().parse("[Test]_1001_High_Values")[0], SxE::regular(10, 1));
        assert_eq!(
            parser().parse("the.simpsons.2321.hdtv-lol"),
            vec![SxE::regular(23, 21)]
        );
        assert_eq!(parser().parse("Test_-_103_[1280x720]")[0], SxE::regular(1, 3));
    }

    #[test]
    fn test_year_tokens_ignored() {
        assert_eq!(parser().parse("Show Name 2010 Special"), vec![]);
        assert_eq!(parser().parse("720p"), vec![]);
    }

    #[test]
    fn test_digit_run_fallback() {
        assert_eq!(parser().parse("TWalkingDead4071080p"), vec![SxE::regular(4, 7)]);
    }

    #[test]
    fn test_dotted_ignores_dates() {
        assert_eq!(parser().parse("Show.Name.1.02.Title")[0], SxE::regular(1, 2));
        assert_eq!(
            parser().parse("The.Daily.Show.2015.07.22.Guest"),
            vec![]
        );
    }

    #[test]
    fn test_strict_mode() {
        let strict = SeasonEpisodeParser::strict();
        assert_eq!(strict.parse("Show.S01E02"), vec![SxE::regular(1, 2)]);
        assert_eq!(strict.parse("Atlantis.2013.1x04.Twist.of.Fate")[0], SxE::regular(1, 4));
        // ambiguous numerics need the lenient parser
        assert_eq!(strict.parse("Test.101"), vec![]);
        assert_eq!(strict.parse("alias.101.Part1"), vec![]);
    }

    #[test]
    fn test_season_folder_backfill() {
        let p = parser();
        assert_eq!(
            p.parse_path(&PathBuf::from("Show/Season 3/07.mkv")),
            vec![SxE::regular(3, 7)]
        );
        assert_eq!(
            p.parse_path(&PathBuf::from("Show/Season 1/Show.S01E02.mkv")),
            vec![SxE::regular(1, 2)]
        );
    }

    #[test]
    fn test_parse_path_uses_folders() {
        let p = parser();
        assert_eq!(
            p.parse_path(&PathBuf::from("Show.1x05/episode.mkv")),
            vec![SxE::regular(1, 5)]
        );
    }
}
