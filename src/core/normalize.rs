//! File name cleanup and text normalization.
//!
//! Release names carry a lot of noise that is irrelevant for matching:
//! embedded CRC32 checksums, codec and resolution tags, brackets and
//! punctuation. The helpers here strip that noise so the similarity
//! metrics and numeric extractors see comparable text.

use crate::core::sxe::SxE;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;

static EMBEDDED_CHECKSUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\(\[][0-9A-Fa-f]{8}[\)\]]").unwrap());

static TRAILING_BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[\(\[][^\(\[\)\]]+[\)\]]\s*$").unwrap());

static BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\(\[\{][^\(\[\{\)\]\}]*[\)\]\}]").unwrap());

static APOSTROPHE: Lazy<Regex> = Lazy::new(|| Regex::new(r"['`´‘’]").unwrap());

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[[:punct:][:space:]]+").unwrap());

static FORMAT_INFO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)\b(
            \d{3,4}p | 2160p | 1080i | 720p | 480p
            | x26[45] | h[._ ]?26[45] | hevc | avc | xvid | divx | 10bit
            | hdtv | pdtv | bluray | blu-ray | bdrip | brrip | dvdrip | webrip | web-?dl
            | aac | ac3 | dts | flac | mp3
            | proper | repack | internal | limited | unrated | extended
        )\b",
    )
    .unwrap()
});

/// Character immediately before byte offset `idx`, if any.
pub fn char_before(text: &str, idx: usize) -> Option<char> {
    text[..idx].chars().next_back()
}

/// Character starting at byte offset `idx`, if any.
pub fn char_after(text: &str, idx: usize) -> Option<char> {
    text[idx..].chars().next()
}

/// Remove CRC32 checksum tags like `[A1B2C3D4]`.
pub fn remove_embedded_checksum(text: &str) -> String {
    EMBEDDED_CHECKSUM.replace_all(text, "").into_owned()
}

/// Remove a trailing bracket group like ` (2004)` or ` [720p]`, but never
/// an opening one, so names that are entirely bracketed stay intact.
pub fn remove_trailing_brackets(text: &str) -> String {
    match TRAILING_BRACKETS.find(text) {
        Some(m) if m.start() > 0 => text[..m.start()].to_string(),
        _ => text.to_string(),
    }
}

/// Remove all bracketed groups anywhere in the text.
pub fn normalize_brackets(text: &str) -> String {
    BRACKETS.replace_all(text, " ").into_owned()
}

/// Blank out codec, resolution and source tags.
pub fn strip_format_info(text: &str) -> String {
    FORMAT_INFO.replace_all(text, " ").into_owned()
}

/// Collapse punctuation and whitespace runs into single spaces and trim.
pub fn normalize_punctuation(text: &str) -> String {
    let text = APOSTROPHE.replace_all(text, "");
    PUNCTUATION.replace_all(&text, " ").trim().to_string()
}

/// Full normalization used by the text similarity metrics: checksums,
/// trailing bracket groups and format tags removed, punctuation
/// collapsed, lowercased.
pub fn normalize_name(text: &str) -> String {
    let text = remove_embedded_checksum(text);
    let text = remove_trailing_brackets(&text);
    let text = strip_format_info(&text);
    normalize_punctuation(&text).to_lowercase()
}

/// Memoization cache shared across metrics.
///
/// Matching scores every value/candidate pair at every cascade level, so
/// the same strings get normalized and parsed many times over. The maps
/// key by [`crate::models::media::MediaItem::cache_key`].
#[derive(Debug, Default)]
pub struct TextCache {
    names: Mutex<HashMap<String, String>>,
    numbers: Mutex<HashMap<String, Vec<SxE>>>,
    dates: Mutex<HashMap<String, Option<NaiveDate>>>,
}

impl TextCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalized form of `text`, computed once per key.
    pub fn normalized(&self, key: &str, text: &str) -> String {
        let mut names = self.names.lock();
        if let Some(hit) = names.get(key) {
            return hit.clone();
        }
        let computed = normalize_name(text);
        names.insert(key.to_string(), computed.clone());
        computed
    }

    /// Season/episode numbers for `key`, parsed on first use.
    pub fn numbers_or_insert_with<F>(&self, key: &str, parse: F) -> Vec<SxE>
    where
        F: FnOnce() -> Vec<SxE>,
    {
        let mut numbers = self.numbers.lock();
        if let Some(hit) = numbers.get(key) {
            return hit.clone();
        }
        let computed = parse();
        numbers.insert(key.to_string(), computed.clone());
        computed
    }

    /// Air date for `key`, parsed on first use.
    pub fn date_or_insert_with<F>(&self, key: &str, parse: F) -> Option<NaiveDate>
    where
        F: FnOnce() -> Option<NaiveDate>,
    {
        let mut dates = self.dates.lock();
        if let Some(hit) = dates.get(key) {
            return *hit;
        }
        let computed = parse();
        dates.insert(key.to_string(), computed);
        computed
    }
}
