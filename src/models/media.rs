//! Media-related data models.
//!
//! The matching engine operates on a closed universe of item kinds:
//! local files, episode/movie/audio-track metadata records, and raw
//! strings. [`MediaItem`] is the tagged union over that universe; metric
//! normalization dispatches on it with exhaustive `match` arms so the
//! "score 0 on type mismatch" contract is compiler-checked.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A local file the matcher treats as a value to be resolved.
///
/// The engine never touches the filesystem; callers populate size and
/// modification time when they are available.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileRecord {
    /// Full path to the file.
    pub path: PathBuf,
    /// File size in bytes, if known.
    pub size: Option<u64>,
    /// Last modified time, if known.
    pub modified: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Create a record carrying only a path.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            size: None,
            modified: None,
        }
    }

    /// File name without the extension.
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name including the extension.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Parent directory path as a string, if any.
    pub fn parent(&self) -> Option<String> {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.display().to_string())
    }

    /// Last `n` path components, file name first, extension trimmed from
    /// the file name component.
    pub fn path_tail(&self, n: usize) -> Vec<String> {
        let mut tail = vec![self.name()];
        let mut current: Option<&Path> = self.path.parent();
        while tail.len() < n {
            match current.and_then(|p| p.file_name()) {
                Some(component) => {
                    tail.push(component.to_string_lossy().into_owned());
                    current = current.and_then(|p| p.parent());
                }
                None => break,
            }
        }
        tail
    }
}

/// Aggregated series information attached to an episode record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesInfo {
    /// User rating (0-10).
    pub rating: Option<f32>,
    /// Number of votes behind the rating.
    pub rating_count: Option<u32>,
}

/// Episode metadata record from an external provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Episode {
    /// Primary series name.
    pub series_name: String,
    /// Alternative series names.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Season number within the series.
    pub season: Option<u32>,
    /// Episode number within the season.
    pub episode: Option<u32>,
    /// Absolute episode number across all seasons.
    pub absolute: Option<u32>,
    /// Special number, for specials outside regular season numbering.
    pub special: Option<u32>,
    /// Air date.
    pub airdate: Option<NaiveDate>,
    /// Episode title.
    pub title: Option<String>,
    /// Series-level information, if resolved.
    pub series: Option<SeriesInfo>,
}

impl Episode {
    /// Format the season/episode identifier like `1x05`, or the absolute
    /// number when no regular numbering exists.
    pub fn format_numbers(&self) -> String {
        match (self.season, self.episode) {
            (Some(s), Some(e)) => format!("{}x{:02}", s, e),
            (None, Some(e)) => format!("{:02}", e),
            _ => self
                .absolute
                .map(|a| a.to_string())
                .unwrap_or_default(),
        }
    }

    /// All known names for the series, primary name first.
    pub fn series_names(&self) -> Vec<&str> {
        let mut names = vec![self.series_name.as_str()];
        names.extend(self.aliases.iter().map(|s| s.as_str()));
        names
    }
}

impl std::fmt::Display for Episode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.series_name, self.format_numbers())?;
        if let Some(title) = &self.title {
            write!(f, " - {}", title)?;
        }
        Ok(())
    }
}

/// A run of episodes matched to a single file (e.g. `S01E01-02`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiEpisode {
    pub episodes: Vec<Episode>,
}

impl std::fmt::Display for MultiEpisode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.episodes.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", parts.join(" + "))
    }
}

/// Movie metadata record from an external provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Movie {
    /// Primary movie name.
    pub name: String,
    /// Alternative names.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Release year.
    pub year: Option<u16>,
    /// External database id (e.g. TMDB).
    pub tmdb_id: Option<u64>,
    /// IMDB id.
    pub imdb_id: Option<String>,
}

impl Movie {
    /// All known names for the movie, primary name first.
    pub fn effective_names(&self) -> Vec<&str> {
        let mut names = vec![self.name.as_str()];
        names.extend(self.aliases.iter().map(|s| s.as_str()));
        names
    }
}

impl std::fmt::Display for Movie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.year {
            Some(year) => write!(f, "{} ({})", self.name, year),
            None => write!(f, "{}", self.name),
        }
    }
}

/// One part of a multi-part movie (e.g. `CD1`/`CD2` rips).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoviePart {
    pub movie: Movie,
    /// 1-based part index.
    pub part: u32,
    /// Total number of parts, if known.
    pub part_count: Option<u32>,
}

impl std::fmt::Display for MoviePart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (part {})", self.movie, self.part)
    }
}

/// Audio track metadata record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioTrack {
    pub artist: String,
    pub album: Option<String>,
    pub title: String,
    pub track_number: Option<u32>,
}

impl std::fmt::Display for AudioTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

/// Tagged union over everything the matcher can compare.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaItem {
    File(FileRecord),
    Episode(Episode),
    MultiEpisode(MultiEpisode),
    Movie(Movie),
    MoviePart(MoviePart),
    AudioTrack(AudioTrack),
    Text(String),
}

impl MediaItem {
    /// Human-readable name used for display and as the basis of text
    /// normalization.
    pub fn name(&self) -> String {
        match self {
            MediaItem::File(f) => f.name(),
            MediaItem::Episode(e) => e.to_string(),
            MediaItem::MultiEpisode(m) => m.to_string(),
            MediaItem::Movie(m) => m.to_string(),
            MediaItem::MoviePart(p) => p.to_string(),
            MediaItem::AudioTrack(t) => t.to_string(),
            MediaItem::Text(s) => s.clone(),
        }
    }

    /// Stable key used by memoization caches. Files key by full path so
    /// two files with equal names in different folders stay distinct.
    pub fn cache_key(&self) -> String {
        match self {
            MediaItem::File(f) => f.path.display().to_string(),
            other => other.name(),
        }
    }
}

impl std::fmt::Display for MediaItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<FileRecord> for MediaItem {
    fn from(value: FileRecord) -> Self {
        MediaItem::File(value)
    }
}

impl From<Episode> for MediaItem {
    fn from(value: Episode) -> Self {
        MediaItem::Episode(value)
    }
}

impl From<Movie> for MediaItem {
    fn from(value: Movie) -> Self {
        MediaItem::Movie(value)
    }
}

impl From<&str> for MediaItem {
    fn from(value: &str) -> Self {
        MediaItem::Text(value.to_string())
    }
}
