//! Core data models for the library scraper

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ScrapeError;

/// Media type classification used by the host chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Feature films
    Movie,
    /// Series, seasons and episodes
    Tv,
}

impl MediaType {
    /// Map a path suffix or host value to a media type.
    ///
    /// Unknown tags map to `None`, which leaves detection to the filename guess.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "movie" | "movies" | "电影" => Some(MediaType::Movie),
            "tv" | "tv-show" | "tvshow" | "tv_show" | "电视剧" => Some(MediaType::Tv),
            _ => None,
        }
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata guessed from a file name and its directories
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaCandidate {
    /// Cleaned title
    pub title: String,
    /// Release year, if present in the name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    /// Season number for episodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    /// Episode number for episodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    /// Media type inferred from the name, or forced by the scrape path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
}

/// A media file visited during a scan pass
#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Full path to the file
    pub path: PathBuf,
    /// Metadata guess, with the forced type applied
    pub meta: MetaCandidate,
    /// External identifier recovered from a sidecar file
    pub tmdbid: Option<String>,
}

impl MediaFile {
    /// Build a media file from its path, guessing metadata from the name.
    ///
    /// A forced type overrides whatever the guess inferred.
    pub fn new(path: PathBuf, forced: Option<MediaType>) -> Self {
        let mut meta = MetaCandidate::from_path(&path);
        if forced.is_some() {
            meta.media_type = forced;
        }
        Self {
            path,
            meta,
            tmdbid: None,
        }
    }

    /// Set the recovered identifier
    pub fn with_tmdbid(mut self, tmdbid: Option<String>) -> Self {
        self.tmdbid = tmdbid;
        self
    }

    /// Effective media type
    pub fn media_type(&self) -> Option<MediaType> {
        self.meta.media_type
    }
}

/// Result of a host recognition call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// External database identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<u64>,
    /// Recognized media type
    pub media_type: MediaType,
    /// Display title
    pub title: String,
    /// Release year
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
}

/// A prior transfer recorded by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Source path of the transfer
    pub src: String,
    /// Destination path of the transfer
    pub dest: String,
    /// Media type value
    pub mtype: String,
    /// Title used when the media was first ingested
    pub title: String,
    /// Release year
    pub year: Option<u32>,
    /// External database identifier
    pub tmdbid: u64,
    /// Transfer timestamp
    pub date: String,
}

/// A file handed to the host scraping chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedFile {
    /// File that was scraped
    pub path: PathBuf,
    /// Title passed to the host
    pub title: String,
    /// Identifier of the recognized media
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<u64>,
    /// Whether the identifier came from a sidecar file
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub from_nfo: bool,
    /// Metadata overwrite flag
    pub force_nfo: bool,
    /// Image overwrite flag
    pub force_image: bool,
}

/// Outcome of processing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// The host chain was invoked for the file
    Scraped(ScrapedFile),
    /// Recognition found nothing; the file was skipped
    Unrecognized,
}

/// Result of a scan pass
#[derive(Debug, Default, Serialize)]
pub struct ScanResult {
    /// Number of configured paths that were walked
    pub scanned_paths: u64,
    /// Number of configured paths that did not exist
    pub missing_paths: u64,
    /// Number of media files visited
    pub total_files: u64,
    /// Number of files skipped by the exclusion list
    pub excluded_files: u64,
    /// Number of files recognition could not identify
    pub unrecognized_files: u64,
    /// Number of sidecar files deleted by the cleaner
    pub removed_nfos: u64,
    /// Whether the pass stopped because of cancellation
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
    /// Files handed to the host scraping chain, in visiting order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scraped: Vec<ScrapedFile>,
    /// Errors encountered during the pass
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ScrapeError>,
    /// Total scan duration in milliseconds
    pub duration_ms: u64,
}

impl ScanResult {
    /// Create a new empty scan result
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scraped files
    pub fn scraped_count(&self) -> usize {
        self.scraped.len()
    }

    /// Get the number of errors
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Check if the pass completed without errors
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_from_tag() {
        assert_eq!(MediaType::from_tag("movie"), Some(MediaType::Movie));
        assert_eq!(MediaType::from_tag("电影"), Some(MediaType::Movie));
        assert_eq!(MediaType::from_tag("TV-Show"), Some(MediaType::Tv));
        assert_eq!(MediaType::from_tag("电视剧"), Some(MediaType::Tv));
        assert_eq!(MediaType::from_tag("bogus"), None);
        assert_eq!(MediaType::from_tag(""), None);
    }

    #[test]
    fn test_media_file_forced_type_wins() {
        let file = MediaFile::new(PathBuf::from("/tv/Show.S01E02.mkv"), Some(MediaType::Movie));
        assert_eq!(file.media_type(), Some(MediaType::Movie));

        let file = MediaFile::new(PathBuf::from("/tv/Show.S01E02.mkv"), None);
        assert_eq!(file.media_type(), Some(MediaType::Tv));
    }

    #[test]
    fn test_scan_result_default() {
        let result = ScanResult::new();
        assert_eq!(result.total_files, 0);
        assert_eq!(result.scraped_count(), 0);
        assert!(result.is_success());
        assert!(!result.cancelled);
    }

    #[test]
    fn test_scraped_file_serialization() {
        let file = ScrapedFile {
            path: PathBuf::from("/m/a.mkv"),
            title: "A".to_string(),
            tmdb_id: None,
            from_nfo: false,
            force_nfo: true,
            force_image: false,
        };
        let json = serde_json::to_string(&file).unwrap();
        assert!(!json.contains("tmdb_id"));
        assert!(!json.contains("from_nfo"));
        assert!(json.contains("\"force_nfo\":true"));
    }

    #[test]
    fn test_scan_result_serializes_errors() {
        let mut result = ScanResult::new();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("errors").is_none());

        result
            .errors
            .push(ScrapeError::not_found(PathBuf::from("/media/missing")));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["errors"][0]["kind"], "NotFound");
        assert_eq!(json["errors"][0]["path"], "/media/missing");
        assert!(json["errors"][0]["message"].as_str().unwrap().contains("missing"));
    }
}
