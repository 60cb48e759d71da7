//! Season/episode identifiers and plausibility filtering.

use serde::{Deserialize, Serialize};

/// Sentinel for an unknown season or episode number.
pub const UNDEFINED: i32 = -1;

/// A season/episode number pair extracted from a file name.
///
/// Either component may be [`UNDEFINED`]. An undefined season with a
/// defined episode usually means absolute numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SxE {
    pub season: i32,
    pub episode: i32,
}

impl SxE {
    pub fn new(season: i32, episode: i32) -> Self {
        Self { season, episode }
    }

    /// Pair with a known season and episode.
    pub fn regular(season: i32, episode: i32) -> Self {
        Self { season, episode }
    }

    /// Absolute-numbered pair with no season.
    pub fn absolute(episode: i32) -> Self {
        Self {
            season: UNDEFINED,
            episode,
        }
    }

    /// Parse both components from captured digit strings. Missing or
    /// unparsable input maps to [`UNDEFINED`].
    pub fn from_captures(season: Option<&str>, episode: Option<&str>) -> Self {
        Self {
            season: parse_number(season),
            episode: parse_number(episode),
        }
    }

    pub fn has_season(&self) -> bool {
        self.season != UNDEFINED
    }

    pub fn has_episode(&self) -> bool {
        self.episode != UNDEFINED
    }
}

impl std::fmt::Display for SxE {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_season() {
            write!(f, "{}x{:02}", self.season, self.episode)
        } else {
            write!(f, "{:02}", self.episode)
        }
    }
}

fn parse_number(s: Option<&str>) -> i32 {
    s.and_then(|s| s.parse::<i32>().ok()).unwrap_or(UNDEFINED)
}

/// Numeric plausibility filter for extracted season/episode pairs.
///
/// Numeric-only patterns like `103` are ambiguous, so extracted pairs are
/// checked against soft limits before being reported. Season numbers in
/// the year window pass regardless of the season limit so date-based
/// naming schemes like `S2010E01` survive.
#[derive(Debug, Clone, Copy)]
pub struct SeasonEpisodeFilter {
    /// Upper bound (exclusive) for season numbers.
    pub season_limit: i32,
    /// Upper bound (exclusive) for episode numbers within a season.
    pub season_episode_limit: i32,
    /// Upper bound (exclusive) for absolute episode numbers.
    pub absolute_episode_limit: i32,
    /// Start of the season year window (inclusive).
    pub season_year_begin: i32,
    /// End of the season year window (exclusive).
    pub season_year_end: i32,
}

impl SeasonEpisodeFilter {
    pub const DEFAULT: SeasonEpisodeFilter = SeasonEpisodeFilter {
        season_limit: 50,
        season_episode_limit: 50,
        absolute_episode_limit: 1000,
        season_year_begin: 1970,
        season_year_end: 2100,
    };

    /// Restrictive filter for the last-resort digit-prefix heuristic,
    /// which produces far more false positives than the other patterns.
    pub const TIGHT: SeasonEpisodeFilter = SeasonEpisodeFilter {
        season_limit: 10,
        season_episode_limit: 30,
        absolute_episode_limit: 0,
        season_year_begin: 1970,
        season_year_end: 2100,
    };

    /// True if the value looks like a calendar year.
    pub fn in_year_window(&self, n: i32) -> bool {
        n >= self.season_year_begin && n < self.season_year_end
    }

    /// Accept or reject an extracted pair.
    pub fn accept(&self, sxe: &SxE) -> bool {
        if !sxe.has_season() {
            return sxe.episode < self.absolute_episode_limit;
        }
        (sxe.season < self.season_limit || self.in_year_window(sxe.season))
            && sxe.episode < self.season_episode_limit
    }
}
