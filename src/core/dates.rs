//! Air date extraction from file names.
//!
//! Daily shows are commonly named by air date instead of season/episode
//! numbers, e.g. `The.Daily.Show.2015.07.22.Guest.mkv`. The parser below
//! tries a few date layouts in order and returns the first hit that is a
//! real calendar date inside a sane year range.

use crate::core::normalize::{char_after, char_before};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

const YEAR_MIN: i32 = 1930;
const YEAR_MAX: i32 = 2050;

static YMD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})[._ -](\d{1,2})[._ -](\d{1,2})").unwrap());

static DMY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})[._ -](\d{1,2})[._ -](\d{4})").unwrap());

static COMPACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{8}").unwrap());

/// Extracts air dates embedded in file names.
#[derive(Debug, Default)]
pub struct DateParser;

impl DateParser {
    pub fn new() -> Self {
        Self
    }

    /// First plausible date found in `text`, or `None`.
    pub fn parse(&self, text: &str) -> Option<NaiveDate> {
        let mut found = None;
        self.visit(text, |_, _, date| {
            found = Some(date);
            false
        });
        found
    }

    /// Byte ranges of every plausible date occurrence in `text`.
    pub fn find_ranges(&self, text: &str) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        self.visit(text, |start, end, _| {
            ranges.push((start, end));
            true
        });
        ranges
    }

    /// Walk all date layouts over `text`, calling `on_date` for each
    /// boundary-checked, calendar-valid hit. The callback returns whether
    /// to keep going.
    fn visit<F>(&self, text: &str, mut on_date: F)
    where
        F: FnMut(usize, usize, NaiveDate) -> bool,
    {
        if !scan(&YMD, text, |c| make_date(num(c, 1), num(c, 2), num(c, 3)), &mut on_date) {
            return;
        }
        if !scan(&DMY, text, |c| make_date(num(c, 3), num(c, 2), num(c, 1)), &mut on_date) {
            return;
        }
        scan(
            &COMPACT,
            text,
            |c| {
                let digits = c.get(0).map(|m| m.as_str())?;
                let year = digits[0..4].parse().ok()?;
                let month = digits[4..6].parse().ok()?;
                let day = digits[6..8].parse().ok()?;
                make_date(year, month, day)
            },
            &mut on_date,
        );
    }
}

/// Blank out every recognized date so its digits cannot be misread as
/// season/episode numbers downstream. Replaced bytes are ASCII, so the
/// result keeps all offsets intact.
pub fn strip_dates(text: &str) -> String {
    let ranges = DateParser::new().find_ranges(text);
    if ranges.is_empty() {
        return text.to_string();
    }
    let mut bytes = text.as_bytes().to_vec();
    for (start, end) in ranges {
        bytes[start..end].fill(b' ');
    }
    String::from_utf8(bytes).unwrap_or_else(|_| text.to_string())
}

fn num(captures: &regex::Captures<'_>, group: usize) -> i32 {
    captures
        .get(group)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(-1)
}

/// Reject impossible calendar dates and implausible years.
fn make_date(year: i32, month: i32, day: i32) -> Option<NaiveDate> {
    if !(YEAR_MIN..=YEAR_MAX).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Find matches of `pattern` that sit on non-digit boundaries and convert
/// to valid dates. Matches failing either check are skipped and the scan
/// continues after their start. Returns whether the caller should keep
/// visiting further layouts.
fn scan<C, F>(pattern: &Regex, text: &str, convert: C, on_date: &mut F) -> bool
where
    C: Fn(&regex::Captures<'_>) -> Option<NaiveDate>,
    F: FnMut(usize, usize, NaiveDate) -> bool,
{
    let mut from = 0;
    while from < text.len() {
        let Some(captures) = pattern.captures(&text[from..]) else {
            return true;
        };
        let whole = captures.get(0).unwrap();
        let start = from + whole.start();
        let end = from + whole.end();

        let bounded = !char_before(text, start).is_some_and(|c| c.is_ascii_digit())
            && !char_after(text, end).is_some_and(|c| c.is_ascii_digit());
        if bounded {
            if let Some(date) = convert(&captures) {
                if !on_date(start, end, date) {
                    return false;
                }
                from = end;
                continue;
            }
        }

        let step = char_after(text, start).map(|c| c.len_utf8()).unwrap_or(1);
        from = start + step;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_ymd() {
        let parser = DateParser::new();
        assert_eq!(
            parser.parse("The.Daily.Show.2015.07.22.Guest"),
            Some(date(2015, 7, 22))
        );
        assert_eq!(parser.parse("Show 2015-7-2"), Some(date(2015, 7, 2)));
    }

    #[test]
    fn test_dmy() {
        let parser = DateParser::new();
        assert_eq!(parser.parse("Show 22.07.2015"), Some(date(2015, 7, 22)));
    }

    #[test]
    fn test_compact() {
        let parser = DateParser::new();
        assert_eq!(parser.parse("Show.20150722.HDTV"), Some(date(2015, 7, 22)));
    }

    #[test]
    fn test_invalid_dates_skipped() {
        let parser = DateParser::new();
        // month 13 is not a date
        assert_eq!(parser.parse("Show.2015.13.40"), None);
        // year outside the plausible window
        assert_eq!(parser.parse("Show.1492.01.01"), None);
    }

    #[test]
    fn test_digit_boundaries() {
        let parser = DateParser::new();
        // date glued to more digits is not a date
        assert_eq!(parser.parse("0020150722"), None);
    }

    #[test]
    fn test_no_date() {
        let parser = DateParser::new();
        assert_eq!(parser.parse("Show.Name.S01E02"), None);
    }

    #[test]
    fn test_strip_dates() {
        assert_eq!(
            strip_dates("Show.2015.07.22.Guest"),
            "Show.          .Guest"
        );
        assert_eq!(strip_dates("Show.S01E02"), "Show.S01E02");
    }
}
